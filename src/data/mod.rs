// mod.rs - Data structures module

pub mod genome;
pub mod mapping;
pub mod sequence;

// Re-export main types for convenience
pub use genome::{discover_genomes, GenomeSet, GENOME_COUNT};
pub use mapping::{NamedSequence, NamedSequences};
pub use sequence::{validate_aligned, validate_sequence, Alphabet, CodingSequence, GAP};
