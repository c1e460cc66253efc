// mod.rs - Core logic module

pub mod alignment;
pub mod distance;
pub mod orthology;
pub mod pairwise;
pub mod phylogeny;
pub mod triple;

// Re-export main types for convenience
pub use alignment::AlignmentConfig;
pub use distance::{
    hamming, hamming_transition_aware, jaccard_distance, jukes_cantor, levenshtein,
    DistanceMetric, DEFAULT_KMER_SIZE,
};
pub use orthology::{
    partition, ClusteringConfig, ClusteringOutcome, CoreGenome, OrthologTriplet,
    OrthologyClusterer,
};
pub use pairwise::{PairwiseAligner, ParasailAligner};
pub use phylogeny::{
    consensus, nj_join, select_variable_sites, upgma_join, DistanceMatrix, PhyloNode, PhyloTree,
    PhylogenyBuilder, TreeMethod,
};
pub use triple::{AlignmentTriple, Move, ScoreVolume, TripleAligner};
