// alignment.rs - Scoring configuration for the three-way aligner

use serde::{Deserialize, Serialize};

/// Flat scoring scheme: one score per match, mismatch and gapped position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_penalty: i32,
    pub description: Option<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_score: -1,
            gap_penalty: -2,
            description: Some("Default core genome parameters".to_string()),
        }
    }
}

impl AlignmentConfig {
    /// Create configuration from mode string
    pub fn from_mode(mode: &str) -> Result<Self, String> {
        match mode {
            "dna" => Ok(Self {
                match_score: 2,
                mismatch_score: -1,
                gap_penalty: -2,
                description: Some("Standard DNA alignment".to_string()),
            }),
            "dna-strict" => Ok(Self {
                match_score: 3,
                mismatch_score: -2,
                gap_penalty: -4,
                description: Some("Strict DNA alignment (higher penalties)".to_string()),
            }),
            "dna-permissive" => Ok(Self {
                match_score: 1,
                mismatch_score: 0,
                gap_penalty: -1,
                description: Some("Permissive DNA alignment (lower penalties)".to_string()),
            }),
            _ => Err(format!(
                "Unknown alignment mode: {}. Use: dna, dna-strict, dna-permissive",
                mode
            )),
        }
    }

    /// Create custom configuration
    pub fn custom(match_score: i32, mismatch_score: i32, gap_penalty: i32) -> Self {
        Self {
            match_score,
            mismatch_score,
            gap_penalty,
            description: Some("Custom alignment parameters".to_string()),
        }
    }

    /// Score of a column pairing two symbols
    #[inline]
    pub fn pair_score(&self, a: u8, b: u8) -> i32 {
        if a == b {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    /// Score of a column pairing three symbols: a match only when all three agree
    #[inline]
    pub fn triple_score(&self, a: u8, b: u8, c: u8) -> i32 {
        if a == b && b == c {
            self.match_score
        } else {
            self.mismatch_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dna = AlignmentConfig::from_mode("dna").unwrap();
        assert_eq!(dna.match_score, 2);
        assert_eq!(dna.mismatch_score, -1);
        assert_eq!(dna.gap_penalty, -2);
        assert_eq!(dna, AlignmentConfig { description: dna.description.clone(), ..AlignmentConfig::default() });
        assert!(AlignmentConfig::from_mode("protein-blosum").is_err());
    }

    #[test]
    fn test_column_scores() {
        let config = AlignmentConfig::default();
        assert_eq!(config.pair_score(b'A', b'A'), 2);
        assert_eq!(config.pair_score(b'A', b'C'), -1);
        assert_eq!(config.triple_score(b'G', b'G', b'G'), 2);
        assert_eq!(config.triple_score(b'G', b'G', b'T'), -1);
    }
}
