// lib.rs - cgtrio library root

//! # cgtrio - Core genome alignment and phylogeny for three bacterial genomes
//!
//! The library finds ortholog triplets across three genomes, concatenates
//! them into one core genome per genome, aligns the three core genomes with
//! a three-way dynamic program and builds a three-leaf tree from the result.
//!
//! ## Features
//!
//! - **Parallel ortholog search**: greedy triplet screening split over a
//!   fork-join task tree
//! - **Three-way global alignment**: exact sum-of-pairs dynamic program
//! - **Distance metrics**: Hamming, transition-aware Hamming, Jukes-Cantor,
//!   k-mer Jaccard and Levenshtein
//! - **Trees**: Neighbor-Joining and UPGMA for three taxa
//! - **Multiple formats**: TSV, CSV, PHYLIP, NEXUS distance matrices
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use cgtrio::prelude::*;
//! use cgtrio::output::sink::NullProgress;
//!
//! let genomes = [
//!     GenomeSet::from_fasta("g1", std::path::Path::new("g1/cds.fna"))?,
//!     GenomeSet::from_fasta("g2", std::path::Path::new("g2/cds.fna"))?,
//!     GenomeSet::from_fasta("g3", std::path::Path::new("g3/cds.fna"))?,
//! ];
//!
//! let clusterer = OrthologyClusterer::new(ParasailAligner::default(), ClusteringConfig::default());
//! let outcome = clusterer.cluster(&genomes, &NullProgress)?;
//! let core = outcome.core_genome().concatenate();
//!
//! let rows: Vec<&[u8]> = core.rows().map(|(_, seq)| seq).collect();
//! let triple = TripleAligner::default().align(rows[0], rows[1], rows[2])?;
//! let aligned: NamedSequences = core
//!     .names()
//!     .map(String::from)
//!     .zip(triple.rows)
//!     .collect();
//!
//! let tree = PhylogenyBuilder::new(DistanceMetric::Hamming, Some(42)).upgma(&aligned)?;
//! println!("{}", tree);
//! # Ok::<(), cgtrio::TrioError>(())
//! ```

pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;
pub mod pipeline;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{
        AlignmentConfig, ClusteringConfig, DistanceMatrix, DistanceMetric, OrthologTriplet,
        OrthologyClusterer, PairwiseAligner, ParasailAligner, PhyloTree, PhylogenyBuilder,
        TreeMethod, TripleAligner,
    };
    pub use crate::data::{validate_aligned, Alphabet, GenomeSet, NamedSequences};
    pub use crate::error::TrioError;
    pub use crate::output::write_matrix;
    pub use crate::pipeline::{Pipeline, PipelineOptions};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use crate::core::{AlignmentConfig, DistanceMetric, OrthologyClusterer, PhylogenyBuilder, TripleAligner};
pub use data::{GenomeSet, NamedSequences};
pub use error::{Result, TrioError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "cgtrio v{} - Core genome alignment and phylogeny for three genomes",
        VERSION
    )
}
