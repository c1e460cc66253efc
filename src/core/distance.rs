// distance.rs - Pairwise sequence distance metrics

use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{Result, TrioError};

/// k-mer size used for phylogeny when none is given
pub const DEFAULT_KMER_SIZE: usize = 100;

fn require_equal_length(seq1: &[u8], seq2: &[u8]) -> Result<()> {
    if seq1.len() != seq2.len() {
        return Err(TrioError::LengthMismatch {
            left: seq1.len(),
            right: seq2.len(),
        });
    }
    Ok(())
}

/// Number of positions at which two equal-length sequences differ
pub fn hamming(seq1: &[u8], seq2: &[u8]) -> Result<usize> {
    require_equal_length(seq1, seq2)?;
    Ok(seq1.iter().zip(seq2).filter(|(a, b)| a != b).count())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseClass {
    Purine,
    Pyrimidine,
    Unclassified,
}

fn base_class(symbol: u8) -> BaseClass {
    match symbol.to_ascii_uppercase() {
        b'A' | b'G' => BaseClass::Purine,
        b'C' | b'T' | b'U' => BaseClass::Pyrimidine,
        _ => BaseClass::Unclassified,
    }
}

/// Hamming distance weighting transitions 1 and everything else 2.
///
/// A difference counts as a transition only when both symbols are purines
/// (A, G) or both are pyrimidines (C, T, U). Gaps and ambiguity codes belong
/// to neither class, so any difference involving them scores 2. Symbols are
/// compared case-insensitively.
pub fn hamming_transition_aware(seq1: &[u8], seq2: &[u8]) -> Result<usize> {
    require_equal_length(seq1, seq2)?;

    let distance = seq1
        .iter()
        .zip(seq2)
        .filter(|(a, b)| !a.eq_ignore_ascii_case(b))
        .map(|(&a, &b)| {
            let (class_a, class_b) = (base_class(a), base_class(b));
            if class_a == class_b && class_a != BaseClass::Unclassified {
                1
            } else {
                2
            }
        })
        .sum();

    Ok(distance)
}

/// Set of all length-`k` substrings; empty when `k == 0` or `k > len`
pub fn kmer_set(k: usize, sequence: &[u8]) -> HashSet<&[u8]> {
    if k == 0 || k > sequence.len() {
        return HashSet::new();
    }
    sequence.windows(k).collect()
}

/// Jaccard distance between the k-mer sets of two sequences
pub fn jaccard_distance(k: usize, seq1: &[u8], seq2: &[u8]) -> Result<f64> {
    let kmers1 = kmer_set(k, seq1);
    let kmers2 = kmer_set(k, seq2);

    let union = kmers1.union(&kmers2).count();
    if union == 0 {
        return Err(TrioError::EmptyInput(format!(
            "no {}-mers in sequences of length {} and {}",
            k,
            seq1.len(),
            seq2.len()
        )));
    }
    let intersection = kmers1.intersection(&kmers2).count();

    Ok(1.0 - intersection as f64 / union as f64)
}

/// Jukes-Cantor corrected distance: d = -3/4 * ln(1 - 4p/3)
pub fn jukes_cantor(seq1: &[u8], seq2: &[u8]) -> Result<f64> {
    let differences = hamming(seq1, seq2)?;
    if seq1.is_empty() {
        return Err(TrioError::EmptyInput(
            "Jukes-Cantor distance of empty sequences".to_string(),
        ));
    }

    let p = differences as f64 / seq1.len() as f64;
    if p >= 0.75 {
        return Err(TrioError::DomainError { p });
    }
    if differences == 0 {
        return Ok(0.0);
    }
    Ok(-0.75 * (1.0 - 4.0 * p / 3.0).ln())
}

/// Edit distance with unit substitution, insertion and deletion costs
pub fn levenshtein(seq1: &[u8], seq2: &[u8]) -> usize {
    // Rolling rows of the (len1 + 1) x (len2 + 1) table
    let mut previous: Vec<usize> = (0..=seq2.len()).collect();
    let mut current = vec![0; seq2.len() + 1];

    for (i, &a) in seq1.iter().enumerate() {
        current[0] = i + 1;
        for (j, &b) in seq2.iter().enumerate() {
            current[j + 1] = if a == b {
                previous[j]
            } else {
                1 + previous[j].min(previous[j + 1]).min(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[seq2.len()]
}

/// Distance used to fill the phylogeny distance matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceMetric {
    Hamming,
    TransitionAware,
    JukesCantor,
    Jaccard { k: usize },
    Levenshtein,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Jaccard {
            k: DEFAULT_KMER_SIZE,
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        let (name, parameter) = match lowered.split_once(':') {
            Some((name, parameter)) => (name, Some(parameter)),
            None => (lowered.as_str(), None),
        };

        match (name, parameter) {
            ("hamming", None) => Ok(DistanceMetric::Hamming),
            ("transition" | "hamming-transition", None) => Ok(DistanceMetric::TransitionAware),
            ("jukes-cantor" | "jc", None) => Ok(DistanceMetric::JukesCantor),
            ("levenshtein" | "edit", None) => Ok(DistanceMetric::Levenshtein),
            ("jaccard", None) => Ok(DistanceMetric::default()),
            ("jaccard", Some(k)) => {
                let k: usize = k
                    .parse()
                    .map_err(|_| format!("Invalid k-mer size '{}' for jaccard metric", k))?;
                if k == 0 {
                    return Err("k-mer size must be at least 1".to_string());
                }
                Ok(DistanceMetric::Jaccard { k })
            }
            _ => Err(format!(
                "Invalid distance metric: {}. Use: hamming, transition, jukes-cantor, jaccard[:k], levenshtein",
                s
            )),
        }
    }
}

impl DistanceMetric {
    pub fn description(&self) -> String {
        match self {
            DistanceMetric::Hamming => "Hamming distance".to_string(),
            DistanceMetric::TransitionAware => {
                "Hamming distance (transitions 1, transversions 2)".to_string()
            }
            DistanceMetric::JukesCantor => "Jukes-Cantor distance".to_string(),
            DistanceMetric::Jaccard { k } => format!("Jaccard distance over {}-mers", k),
            DistanceMetric::Levenshtein => "Levenshtein edit distance".to_string(),
        }
    }

    pub fn compute(&self, seq1: &[u8], seq2: &[u8]) -> Result<f64> {
        match *self {
            DistanceMetric::Hamming => hamming(seq1, seq2).map(|d| d as f64),
            DistanceMetric::TransitionAware => {
                hamming_transition_aware(seq1, seq2).map(|d| d as f64)
            }
            DistanceMetric::JukesCantor => jukes_cantor(seq1, seq2),
            DistanceMetric::Jaccard { k } => jaccard_distance(k, seq1, seq2),
            DistanceMetric::Levenshtein => Ok(levenshtein(seq1, seq2) as f64),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Hamming => write!(f, "hamming"),
            DistanceMetric::TransitionAware => write!(f, "transition"),
            DistanceMetric::JukesCantor => write!(f, "jukes-cantor"),
            DistanceMetric::Jaccard { k } => write!(f, "jaccard:{}", k),
            DistanceMetric::Levenshtein => write!(f, "levenshtein"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming() {
        assert_eq!(hamming(b"AGCT", b"AGCT").unwrap(), 0);
        assert_eq!(hamming(b"AGCT", b"AGGT").unwrap(), 1);
        assert_eq!(hamming(b"", b"").unwrap(), 0);
        assert!(matches!(
            hamming(b"AGCT", b"AGC"),
            Err(TrioError::LengthMismatch { left: 4, right: 3 })
        ));
    }

    #[test]
    fn test_hamming_transition_aware() {
        // A<->G transition, C<->T transition
        assert_eq!(hamming_transition_aware(b"AC", b"GT").unwrap(), 2);
        // A<->C transversion
        assert_eq!(hamming_transition_aware(b"A", b"C").unwrap(), 2);
        // lowercase is classified too
        assert_eq!(hamming_transition_aware(b"a", b"g").unwrap(), 1);
        assert_eq!(hamming_transition_aware(b"acgt", b"ACGT").unwrap(), 0);
        assert_eq!(hamming_transition_aware(b"a", b"G").unwrap(), 1);
        // gaps and ambiguity codes are unclassified
        assert_eq!(hamming_transition_aware(b"A-", b"-A").unwrap(), 4);
        assert_eq!(hamming_transition_aware(b"N", b"R").unwrap(), 2);
        assert!(hamming_transition_aware(b"A", b"").is_err());
    }

    #[test]
    fn test_kmer_set() {
        let kmers = kmer_set(2, b"ATAT");
        assert_eq!(kmers.len(), 2);
        assert!(kmers.contains(&b"AT"[..]));
        assert!(kmers.contains(&b"TA"[..]));
        assert!(kmer_set(0, b"ATAT").is_empty());
        assert!(kmer_set(5, b"ATAT").is_empty());
        assert_eq!(kmer_set(4, b"ATAT").len(), 1);
    }

    #[test]
    fn test_jaccard_distance() {
        assert_eq!(jaccard_distance(3, b"ATGCATGC", b"ATGCATGC").unwrap(), 0.0);

        // {AT, TG, GC} vs {AT, TC}: intersection 1, union 4
        let d = jaccard_distance(2, b"ATGC", b"ATC").unwrap();
        assert!((d - 0.75).abs() < 1e-12);
        let reverse = jaccard_distance(2, b"ATC", b"ATGC").unwrap();
        assert_eq!(d, reverse);

        assert_eq!(jaccard_distance(2, b"AAAA", b"CCCC").unwrap(), 1.0);
        assert!(matches!(
            jaccard_distance(10, b"ATG", b"ATG"),
            Err(TrioError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_jukes_cantor() {
        assert_eq!(jukes_cantor(b"ACGTACGT", b"ACGTACGT").unwrap(), 0.0);

        // p = 0.25
        let d = jukes_cantor(b"ACGT", b"ACGA").unwrap();
        let expected = -0.75 * (1.0 - 4.0 * 0.25 / 3.0_f64).ln();
        assert!((d - expected).abs() < 1e-12);

        // p = 0.75 saturates
        assert!(matches!(
            jukes_cantor(b"ACGT", b"CATT"),
            Err(TrioError::DomainError { .. })
        ));
        assert!(matches!(
            jukes_cantor(b"AAAA", b"CCCC"),
            Err(TrioError::DomainError { .. })
        ));
        assert!(matches!(jukes_cantor(b"", b""), Err(TrioError::EmptyInput(_))));
        assert!(jukes_cantor(b"AC", b"A").is_err());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein(b"AGCT", b"AGCT"), 0);
        assert_eq!(levenshtein(b"AGCT", b"AGGT"), 1);
        assert_eq!(levenshtein(b"", b"AGT"), 3);
        assert_eq!(levenshtein(b"AGT", b""), 3);
        assert_eq!(levenshtein(b"kitten", b"sitting"), 3);
        // no transposition shortcut
        assert_eq!(levenshtein(b"AG", b"GA"), 2);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("hamming".parse::<DistanceMetric>().unwrap(), DistanceMetric::Hamming);
        assert_eq!(
            "jaccard".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Jaccard { k: 100 }
        );
        assert_eq!(
            "Jaccard:21".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Jaccard { k: 21 }
        );
        assert!("jaccard:0".parse::<DistanceMetric>().is_err());
        assert!("hamming:3".parse::<DistanceMetric>().is_err());
        assert!("euclid".parse::<DistanceMetric>().is_err());

        let metric = DistanceMetric::Jaccard { k: 7 };
        assert_eq!(metric.to_string().parse::<DistanceMetric>().unwrap(), metric);
    }

    #[test]
    fn test_metric_compute() {
        assert_eq!(DistanceMetric::Hamming.compute(b"AC", b"AG").unwrap(), 1.0);
        assert_eq!(DistanceMetric::Levenshtein.compute(b"AC", b"A").unwrap(), 1.0);
        assert!(DistanceMetric::JukesCantor.compute(b"AC", b"A").is_err());
    }
}
