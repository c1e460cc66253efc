// pairwise.rs - Two-sequence global alignment used for orthology screening

use parasail_rs::{Aligner, Matrix};

use crate::data::Alphabet;
use crate::error::{Result, TrioError};

/// Capability consumed by the orthology search
pub trait PairwiseAligner: Send + Sync {
    /// Matched positions over the longer input length, in percent
    fn percent_identity(&self, seq1: &[u8], seq2: &[u8]) -> Result<f64>;

    /// Both inputs padded with gaps to a common length
    fn aligned_pair(&self, seq1: &[u8], seq2: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;
}

/// Parasail Needleman-Wunsch with identity scoring (match 1, mismatch 0, no gap cost)
#[derive(Debug, Clone)]
pub struct ParasailAligner {
    alphabet: Alphabet,
}

const MATCH_SCORE: i32 = 1;
const MISMATCH_SCORE: i32 = 0;
const GAP_OPEN: i32 = 0;
const GAP_EXTEND: i32 = 0;

impl ParasailAligner {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    fn build_aligner(&self, with_trace: bool) -> Result<Aligner> {
        let matrix = Matrix::create(self.alphabet.symbols(), MATCH_SCORE, MISMATCH_SCORE)
            .map_err(|_| {
                TrioError::Alignment(format!(
                    "failed to create {} identity matrix",
                    self.alphabet
                ))
            })?;

        let aligner = if with_trace {
            Aligner::new()
                .matrix(matrix)
                .gap_open(GAP_OPEN)
                .gap_extend(GAP_EXTEND)
                .global()
                .use_trace()
                .build()
        } else {
            Aligner::new()
                .matrix(matrix)
                .gap_open(GAP_OPEN)
                .gap_extend(GAP_EXTEND)
                .global()
                .build()
        };

        Ok(aligner)
    }
}

impl Default for ParasailAligner {
    fn default() -> Self {
        Self::new(Alphabet::Dna)
    }
}

impl PairwiseAligner for ParasailAligner {
    fn percent_identity(&self, seq1: &[u8], seq2: &[u8]) -> Result<f64> {
        let longest = seq1.len().max(seq2.len());
        if longest == 0 {
            return Err(TrioError::EmptyInput(
                "percent identity of two empty sequences".to_string(),
            ));
        }
        if seq1.is_empty() || seq2.is_empty() {
            return Ok(0.0);
        }

        let aligner = self.build_aligner(false)?;
        let result = aligner.align(Some(seq1), seq2).map_err(|_| {
            TrioError::Alignment(format!(
                "global alignment of {} and {} symbols failed",
                seq1.len(),
                seq2.len()
            ))
        })?;

        // With identity scoring the optimal score is the number of matched columns
        let matches = result.get_score().max(0) as f64;
        Ok(matches / longest as f64 * 100.0)
    }

    fn aligned_pair(&self, seq1: &[u8], seq2: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        if seq1.is_empty() || seq2.is_empty() {
            let width = seq1.len().max(seq2.len());
            let pad = |seq: &[u8]| {
                if seq.is_empty() {
                    vec![b'-'; width]
                } else {
                    seq.to_vec()
                }
            };
            return Ok((pad(seq1), pad(seq2)));
        }

        let aligner = self.build_aligner(true)?;
        let result = aligner
            .align(Some(seq1), seq2)
            .map_err(|_| TrioError::Alignment("traceback alignment failed".to_string()))?;
        let traceback = result
            .get_traceback_strings(seq1, seq2)
            .map_err(|_| TrioError::Alignment("traceback strings unavailable".to_string()))?;

        Ok((
            traceback.query.into_bytes(),
            traceback.reference.into_bytes(),
        ))
    }
}
