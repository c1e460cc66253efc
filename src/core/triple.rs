// triple.rs - Simultaneous global alignment of three sequences

//! Needleman-Wunsch generalised to three sequences.
//!
//! The score volume has one cell per triple of prefix lengths. Each interior
//! cell is the best of seven predecessor moves: consume one symbol from every
//! sequence, from two of them (gap in the third), or from one of them (gap in
//! the other two). The traceback replays those moves from the far corner in a
//! fixed priority order so that ties always resolve the same way.

use super::alignment::AlignmentConfig;
use crate::data::GAP;
use crate::error::{Result, TrioError};

/// Predecessor moves, declared in traceback priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// One symbol from each sequence
    Diagonal,
    /// Sequences 1 and 2, gap in 3
    Skip3,
    /// Sequences 1 and 3, gap in 2
    Skip2,
    /// Sequences 2 and 3, gap in 1
    Skip1,
    /// Sequence 1 only
    Only1,
    /// Sequence 2 only
    Only2,
    /// Sequence 3 only
    Only3,
}

impl Move {
    pub const PRIORITY: [Move; 7] = [
        Move::Diagonal,
        Move::Skip3,
        Move::Skip2,
        Move::Skip1,
        Move::Only1,
        Move::Only2,
        Move::Only3,
    ];

    /// Which sequences the move consumes a symbol from
    pub fn consumes(&self) -> (bool, bool, bool) {
        match self {
            Move::Diagonal => (true, true, true),
            Move::Skip3 => (true, true, false),
            Move::Skip2 => (true, false, true),
            Move::Skip1 => (false, true, true),
            Move::Only1 => (true, false, false),
            Move::Only2 => (false, true, false),
            Move::Only3 => (false, false, true),
        }
    }

    /// A move is only possible when every index it decrements is positive
    pub fn is_valid(&self, i: usize, j: usize, k: usize) -> bool {
        let (a, b, c) = self.consumes();
        (!a || i > 0) && (!b || j > 0) && (!c || k > 0)
    }

    fn source(&self, i: usize, j: usize, k: usize) -> (usize, usize, usize) {
        let (a, b, c) = self.consumes();
        (i - a as usize, j - b as usize, k - c as usize)
    }

    /// Edit cost of arriving at `(i, j, k)` through this move
    fn cost(&self, config: &AlignmentConfig, seqs: [&[u8]; 3], i: usize, j: usize, k: usize) -> i32 {
        let gap = config.gap_penalty;
        match self {
            Move::Diagonal => config.triple_score(seqs[0][i - 1], seqs[1][j - 1], seqs[2][k - 1]),
            Move::Skip3 => gap + config.pair_score(seqs[0][i - 1], seqs[1][j - 1]),
            Move::Skip2 => gap + config.pair_score(seqs[0][i - 1], seqs[2][k - 1]),
            Move::Skip1 => gap + config.pair_score(seqs[1][j - 1], seqs[2][k - 1]),
            Move::Only1 | Move::Only2 | Move::Only3 => 2 * gap,
        }
    }
}

/// Dense `(n1 + 1) x (n2 + 1) x (n3 + 1)` table of prefix alignment scores
#[derive(Debug, Clone)]
pub struct ScoreVolume {
    dims: (usize, usize, usize),
    cells: Vec<i32>,
}

impl ScoreVolume {
    fn new(n1: usize, n2: usize, n3: usize) -> Result<Self> {
        let dims = (n1 + 1, n2 + 1, n3 + 1);
        let size = dims
            .0
            .checked_mul(dims.1)
            .and_then(|s| s.checked_mul(dims.2))
            .ok_or_else(|| {
                TrioError::InvalidInput(format!(
                    "score volume {} x {} x {} does not fit in memory",
                    dims.0, dims.1, dims.2
                ))
            })?;
        Ok(Self {
            dims,
            cells: vec![0; size],
        })
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims.1 + j) * self.dims.2 + k
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> i32 {
        self.cells[self.index(i, j, k)]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, k: usize, value: i32) {
        let idx = self.index(i, j, k);
        self.cells[idx] = value;
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        self.dims
    }

    /// Score of the full alignment
    pub fn final_score(&self) -> i32 {
        self.get(self.dims.0 - 1, self.dims.1 - 1, self.dims.2 - 1)
    }
}

/// Three gap-padded rows of equal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentTriple {
    pub rows: [Vec<u8>; 3],
    pub score: i32,
}

impl AlignmentTriple {
    pub fn len(&self) -> usize {
        self.rows[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows[0].is_empty()
    }
}

/// Count of indices that are still positive
fn positive(i: usize, j: usize, k: usize) -> usize {
    (i > 0) as usize + (j > 0) as usize + (k > 0) as usize
}

#[derive(Debug, Clone, Default)]
pub struct TripleAligner {
    config: AlignmentConfig,
}

impl TripleAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Fill the score volume.
    ///
    /// Axis cells (a single positive index) take one gap per consumed symbol
    /// from the origin. Every other cell is the maximum over the moves that
    /// are valid at its indices, so faces reduce to the three two-sequence
    /// moves.
    pub fn fill(&self, seq1: &[u8], seq2: &[u8], seq3: &[u8]) -> Result<ScoreVolume> {
        let seqs = [seq1, seq2, seq3];
        let (n1, n2, n3) = (seq1.len(), seq2.len(), seq3.len());
        let gap = self.config.gap_penalty;
        let mut volume = ScoreVolume::new(n1, n2, n3)?;

        for i in 1..=n1 {
            volume.set(i, 0, 0, i as i32 * gap);
        }
        for j in 1..=n2 {
            volume.set(0, j, 0, j as i32 * gap);
        }
        for k in 1..=n3 {
            volume.set(0, 0, k, k as i32 * gap);
        }

        for i in 0..=n1 {
            for j in 0..=n2 {
                for k in 0..=n3 {
                    if positive(i, j, k) < 2 {
                        continue;
                    }
                    let best = Move::PRIORITY
                        .iter()
                        .filter(|m| m.is_valid(i, j, k))
                        .map(|m| {
                            let (si, sj, sk) = m.source(i, j, k);
                            volume.get(si, sj, sk) + m.cost(&self.config, seqs, i, j, k)
                        })
                        .max()
                        .unwrap_or(i32::MIN);
                    volume.set(i, j, k, best);
                }
            }
        }

        Ok(volume)
    }

    /// Optimal score only
    pub fn score(&self, seq1: &[u8], seq2: &[u8], seq3: &[u8]) -> Result<i32> {
        check_unaligned(seq1, seq2, seq3)?;
        Ok(self.fill(seq1, seq2, seq3)?.final_score())
    }

    /// Optimal score and one deterministic optimal alignment
    pub fn align(&self, seq1: &[u8], seq2: &[u8], seq3: &[u8]) -> Result<AlignmentTriple> {
        check_unaligned(seq1, seq2, seq3)?;
        let volume = self.fill(seq1, seq2, seq3)?;
        self.traceback(&volume, seq1, seq2, seq3)
    }

    /// Walk back from the far corner, taking the first move in priority order
    /// whose source score plus edit cost reproduces the current cell.
    pub fn traceback(
        &self,
        volume: &ScoreVolume,
        seq1: &[u8],
        seq2: &[u8],
        seq3: &[u8],
    ) -> Result<AlignmentTriple> {
        let seqs = [seq1, seq2, seq3];
        let (mut i, mut j, mut k) = (seq1.len(), seq2.len(), seq3.len());
        if volume.dims() != (i + 1, j + 1, k + 1) {
            return Err(TrioError::InvalidInput(
                "score volume does not match the sequences".to_string(),
            ));
        }

        // Built back to front, reversed at the end
        let capacity = i + j + k;
        let mut rows = [
            Vec::with_capacity(capacity),
            Vec::with_capacity(capacity),
            Vec::with_capacity(capacity),
        ];

        while positive(i, j, k) > 0 {
            let chosen = if positive(i, j, k) == 1 {
                // Along an axis only one move exists
                if i > 0 {
                    Move::Only1
                } else if j > 0 {
                    Move::Only2
                } else {
                    Move::Only3
                }
            } else {
                let current = volume.get(i, j, k);
                Move::PRIORITY
                    .iter()
                    .copied()
                    .filter(|m| m.is_valid(i, j, k))
                    .find(|m| {
                        let (si, sj, sk) = m.source(i, j, k);
                        volume.get(si, sj, sk) + m.cost(&self.config, seqs, i, j, k) == current
                    })
                    .ok_or_else(|| {
                        TrioError::InvalidInput(format!(
                            "no predecessor reproduces score {} at ({}, {}, {})",
                            current, i, j, k
                        ))
                    })?
            };

            let (a, b, c) = chosen.consumes();
            rows[0].push(if a { seq1[i - 1] } else { GAP });
            rows[1].push(if b { seq2[j - 1] } else { GAP });
            rows[2].push(if c { seq3[k - 1] } else { GAP });
            (i, j, k) = chosen.source(i, j, k);
        }

        for row in rows.iter_mut() {
            row.reverse();
        }

        Ok(AlignmentTriple {
            rows,
            score: volume.final_score(),
        })
    }
}

/// Inputs to the aligner must not already contain gap symbols
fn check_unaligned(seq1: &[u8], seq2: &[u8], seq3: &[u8]) -> Result<()> {
    for (n, seq) in [seq1, seq2, seq3].iter().enumerate() {
        if let Some(position) = seq.iter().position(|&s| s == GAP) {
            return Err(TrioError::InvalidSymbol {
                context: format!("input sequence {} of triple alignment", n + 1),
                position,
                symbol: GAP as char,
            });
        }
    }
    Ok(())
}
