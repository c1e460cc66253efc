// sequence.rs - Sequence alphabets and input validation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrioError};

pub const GAP: u8 = b'-';

const DNA_SYMBOLS: &[u8] = b"ACGTNRYKMSWBDHV";
const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYBZXJUO*";

/// Symbol set accepted for unaligned input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alphabet {
    Dna,
    Protein,
}

impl Alphabet {
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Dna => DNA_SYMBOLS,
            Alphabet::Protein => PROTEIN_SYMBOLS,
        }
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.symbols().contains(&symbol)
    }
}

impl FromStr for Alphabet {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dna" | "nucleotide" => Ok(Alphabet::Dna),
            "protein" | "aa" => Ok(Alphabet::Protein),
            _ => Err(format!("Invalid alphabet: {}. Use: dna, protein", s)),
        }
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::Dna => write!(f, "dna"),
            Alphabet::Protein => write!(f, "protein"),
        }
    }
}

/// One coding sequence of a genome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingSequence {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl CodingSequence {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Reject any symbol outside `alphabet`, naming the first offending position
pub fn validate_sequence(sequence: &[u8], alphabet: Alphabet, context: &str) -> Result<()> {
    match sequence.iter().position(|&s| !alphabet.contains(s)) {
        Some(position) => Err(TrioError::InvalidSymbol {
            context: context.to_string(),
            position,
            symbol: sequence[position] as char,
        }),
        None => Ok(()),
    }
}

/// Check that aligned rows share one length and use `alphabet` plus gaps
pub fn validate_aligned<'a, I>(rows: I, alphabet: Alphabet) -> Result<usize>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut expected: Option<usize> = None;

    for (name, row) in rows {
        if let Some(position) = row.iter().position(|&s| s != GAP && !alphabet.contains(s)) {
            return Err(TrioError::InvalidSymbol {
                context: format!("aligned sequence '{}'", name),
                position,
                symbol: row[position] as char,
            });
        }
        match expected {
            None => expected = Some(row.len()),
            Some(len) if len != row.len() => {
                return Err(TrioError::RaggedAlignment {
                    context: format!("aligned sequence '{}'", name),
                    expected: len,
                    found: row.len(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(expected.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_parsing() {
        assert_eq!("DNA".parse::<Alphabet>().unwrap(), Alphabet::Dna);
        assert_eq!("protein".parse::<Alphabet>().unwrap(), Alphabet::Protein);
        assert!("rna-fold".parse::<Alphabet>().is_err());
        assert!(Alphabet::Dna.contains(b'N'));
        assert!(!Alphabet::Dna.contains(b'-'));
    }

    #[test]
    fn test_validate_sequence_reports_position() {
        assert!(validate_sequence(b"ATGCN", Alphabet::Dna, "cds_1").is_ok());
        match validate_sequence(b"ATG-C", Alphabet::Dna, "cds_1") {
            Err(TrioError::InvalidSymbol { context, position, symbol }) => {
                assert_eq!(context, "cds_1");
                assert_eq!(position, 3);
                assert_eq!(symbol, '-');
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_aligned() {
        let rows = [("a", &b"AT-G"[..]), ("b", &b"ATCG"[..])];
        assert_eq!(validate_aligned(rows, Alphabet::Dna).unwrap(), 4);

        let ragged = [("a", &b"AT-G"[..]), ("b", &b"ATC"[..])];
        assert!(matches!(
            validate_aligned(ragged, Alphabet::Dna),
            Err(TrioError::RaggedAlignment { expected: 4, found: 3, .. })
        ));

        let bad = [("a", &b"AT?G"[..])];
        assert!(matches!(
            validate_aligned(bad, Alphabet::Dna),
            Err(TrioError::InvalidSymbol { position: 2, .. })
        ));
    }
}
