// error.rs - Library error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the metric, alignment, clustering and phylogeny code
#[derive(Error, Debug)]
pub enum TrioError {
    #[error("length mismatch: {left} vs {right} symbols (equal lengths required)")]
    LengthMismatch { left: usize, right: usize },

    #[error("Jukes-Cantor distance undefined for p = {p:.4} (requires p < 0.75)")]
    DomainError { p: f64 },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("invalid symbol '{symbol}' at position {position} in {context}")]
    InvalidSymbol {
        context: String,
        position: usize,
        symbol: char,
    },

    #[error("ragged alignment: {context} has length {found}, expected {expected}")]
    RaggedAlignment {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("pairwise alignment failed: {0}")]
    Alignment(String),

    #[error("cannot access {}", .path.display())]
    ResourceUnavailable {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TrioError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        TrioError::ResourceUnavailable {
            source,
            path: path.into(),
        }
    }

    /// Structural problems abort the whole run; everything else is local to one comparison
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrioError::EmptyInput(_) | TrioError::ResourceUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fatal() {
        assert!(TrioError::EmptyInput("genome".to_string()).is_fatal());
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(TrioError::io(missing, "missing.fna").is_fatal());
        assert!(!TrioError::Alignment("engine".to_string()).is_fatal());
        assert!(!TrioError::DomainError { p: 0.8 }.is_fatal());
    }
}
