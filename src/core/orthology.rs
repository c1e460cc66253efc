// orthology.rs - Core genome detection across three genomes

//! Greedy ortholog triplet search.
//!
//! For each genome-1 sequence the genome-2 sequences are scanned in order;
//! the first one above the identity threshold is the only genome-2 candidate
//! ever considered. Genome-3 is then scanned in order for the first sequence
//! above the threshold against both. If none exists the genome-1 sequence
//! stays unmatched: the search never falls back to a later genome-2 hit.
//!
//! The work is split into a three level fork-join tree (genome 1 slices,
//! then genome 2 slices, then genome 3 slices). Leaf tasks report what their
//! slices saw and the results are merged after every task has joined, taking
//! the earliest genome-2 hit and, for it, the earliest genome-3 match. The
//! merged outcome is exactly the outcome of the sequential scan.

use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use super::pairwise::PairwiseAligner;
use crate::data::{GenomeSet, NamedSequences};
use crate::error::{Result, TrioError};
use crate::output::sink::{ProgressSink, ScanPosition, TaskId, TripletSink};

pub const DEFAULT_IDENTITY_THRESHOLD: f64 = 94.0;
pub const DEFAULT_FAN_OUT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    /// Percent identity a pair must strictly exceed
    pub identity_threshold: f64,
    /// Number of slices per genome dimension
    pub fan_out: usize,
    pub show_progress: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            identity_threshold: DEFAULT_IDENTITY_THRESHOLD,
            fan_out: DEFAULT_FAN_OUT,
            show_progress: false,
        }
    }
}

/// Three raw sequences judged to be the same gene
#[derive(Debug, Clone, PartialEq)]
pub struct OrthologTriplet {
    /// Index of each member in its genome
    pub members: [usize; 3],
    pub ids: [String; 3],
    pub sequences: [Vec<u8>; 3],
    /// Percent identities of pairs (1,2), (1,3), (2,3)
    pub identities: [f64; 3],
}

/// What one leaf task found for one genome-1 sequence
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    g1: usize,
    g2: usize,
    identity_12: f64,
    /// First genome-3 match in the leaf's slice with identities (1,3), (2,3)
    g3: Option<(usize, f64, f64)>,
}

impl Candidate {
    /// Earlier genome-2 hit wins; for the same hit the earlier genome-3 match wins
    fn precedes(&self, other: &Candidate) -> bool {
        match self.g2.cmp(&other.g2) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => match (self.g3, other.g3) {
                (Some((k, ..)), Some((other_k, ..))) => k < other_k,
                (Some(_), None) => true,
                _ => false,
            },
        }
    }
}

#[derive(Debug, Default)]
struct LeafOutcome {
    candidates: Vec<Candidate>,
    comparisons: usize,
    failed_comparisons: usize,
}

/// Result of a full clustering run
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub genome_names: [String; 3],
    /// Sorted by genome-1 index
    pub triplets: Vec<OrthologTriplet>,
    pub tasks: usize,
    pub comparisons: usize,
    pub failed_comparisons: usize,
}

impl ClusteringOutcome {
    /// Per-genome core genome lists, members in triplet order
    pub fn core_genome(&self) -> CoreGenome {
        let mut members: [Vec<Vec<u8>>; 3] = Default::default();
        for triplet in &self.triplets {
            for (list, sequence) in members.iter_mut().zip(&triplet.sequences) {
                list.push(sequence.clone());
            }
        }
        CoreGenome {
            names: self.genome_names.clone(),
            members,
        }
    }
}

/// Core genome members of each genome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreGenome {
    pub names: [String; 3],
    pub members: [Vec<Vec<u8>>; 3],
}

impl CoreGenome {
    /// One continuous sequence per genome; homologous members sit at the same rank
    pub fn concatenate(&self) -> NamedSequences {
        self.names
            .iter()
            .zip(&self.members)
            .map(|(name, list)| (name.clone(), list.concat()))
            .collect()
    }
}

/// Split `0..len` into at most `parts` contiguous slices; the last one absorbs the remainder
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len);
    if parts == 0 {
        return Vec::new();
    }
    let size = len / parts;
    (0..parts)
        .map(|p| {
            let start = p * size;
            let end = if p + 1 == parts { len } else { start + size };
            start..end
        })
        .collect()
}

pub struct OrthologyClusterer<A: PairwiseAligner> {
    aligner: A,
    config: ClusteringConfig,
}

impl<A: PairwiseAligner> OrthologyClusterer<A> {
    pub fn new(aligner: A, config: ClusteringConfig) -> Self {
        Self { aligner, config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// `Some(identity)` when the pair strictly exceeds the threshold.
    /// Non-fatal aligner errors count as no match; fatal ones abort the task.
    fn above_threshold(
        &self,
        seq1: &[u8],
        seq2: &[u8],
        outcome: &mut LeafOutcome,
    ) -> Result<Option<f64>> {
        outcome.comparisons += 1;
        match self.aligner.percent_identity(seq1, seq2) {
            Ok(identity) if identity > self.config.identity_threshold => Ok(Some(identity)),
            Ok(_) => Ok(None),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => {
                outcome.failed_comparisons += 1;
                Ok(None)
            }
        }
    }

    /// Sequential greedy scan over one slice of each genome
    fn run_leaf(
        &self,
        task: TaskId,
        genomes: &[GenomeSet; 3],
        slices: [Range<usize>; 3],
        progress: &dyn ProgressSink,
    ) -> Result<LeafOutcome> {
        let [g1, g2, g3] = genomes;
        let [r1, r2, r3] = slices;
        let lens = [r1.len(), r2.len(), r3.len()];
        let mut outcome = LeafOutcome::default();

        for (c1, i) in r1.clone().enumerate() {
            let seq1 = &g1.sequences[i].sequence;
            let mut hit = None;

            for (c2, j) in r2.clone().enumerate() {
                let seq2 = &g2.sequences[j].sequence;
                if let Some(identity_12) = self.above_threshold(seq1, seq2, &mut outcome)? {
                    hit = Some((j, identity_12, c2 + 1));
                    break;
                }
                progress.report(&ScanPosition {
                    task,
                    counters: [(c1 + 1, lens[0]), (c2 + 1, lens[1]), (0, lens[2])],
                })?;
            }

            let Some((j, identity_12, c2)) = hit else {
                continue;
            };
            let seq2 = &g2.sequences[j].sequence;

            let mut matched = None;
            for (c3, k) in r3.clone().enumerate() {
                progress.report(&ScanPosition {
                    task,
                    counters: [(c1 + 1, lens[0]), (c2, lens[1]), (c3 + 1, lens[2])],
                })?;
                let seq3 = &g3.sequences[k].sequence;
                let Some(identity_13) = self.above_threshold(seq1, seq3, &mut outcome)? else {
                    continue;
                };
                if let Some(identity_23) = self.above_threshold(seq2, seq3, &mut outcome)? {
                    matched = Some((k, identity_13, identity_23));
                    break;
                }
            }

            outcome.candidates.push(Candidate {
                g1: i,
                g2: j,
                identity_12,
                g3: matched,
            });
        }

        Ok(outcome)
    }

    /// Run the partitioned search and merge the leaf results
    pub fn cluster(
        &self,
        genomes: &[GenomeSet; 3],
        progress: &dyn ProgressSink,
    ) -> Result<ClusteringOutcome> {
        for genome in genomes {
            if genome.is_empty() {
                return Err(TrioError::EmptyInput(format!(
                    "genome '{}' has no coding sequences",
                    genome.name
                )));
            }
            if let Some(cds) = genome.sequences.iter().find(|cds| cds.sequence.is_empty()) {
                return Err(TrioError::EmptyInput(format!(
                    "sequence '{}' in genome '{}' is empty",
                    cds.id, genome.name
                )));
            }
        }
        if self.config.fan_out == 0 {
            return Err(TrioError::InvalidInput(
                "fan-out must be at least 1".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.config.identity_threshold) {
            return Err(TrioError::InvalidInput(format!(
                "identity threshold {} is outside 0..=100",
                self.config.identity_threshold
            )));
        }

        let fan_out = self.config.fan_out;
        let slices1 = partition(genomes[0].len(), fan_out);
        let slices2 = partition(genomes[1].len(), fan_out);
        let slices3 = partition(genomes[2].len(), fan_out);
        let total_tasks = slices1.len() * slices2.len() * slices3.len();

        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(total_tasks as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tasks ({percent}%) ETA: {eta}",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();

        // Nested parallel iterators: each level joins all of its children
        let leaf_results: Vec<Result<LeafOutcome>> = slices1
            .par_iter()
            .enumerate()
            .flat_map(|(a, r1)| {
                let slices3 = &slices3;
                let pb = &pb;
                slices2.par_iter().enumerate().flat_map(move |(b, r2)| {
                    slices3.par_iter().enumerate().map(move |(c, r3)| {
                        let result = self.run_leaf(
                            TaskId([a, b, c]),
                            genomes,
                            [r1.clone(), r2.clone(), r3.clone()],
                            progress,
                        );
                        pb.inc(1);
                        result
                    })
                })
            })
            .collect();

        pb.finish_and_clear();
        progress.finish()?;

        let mut best: BTreeMap<usize, Candidate> = BTreeMap::new();
        let mut comparisons = 0;
        let mut failed_comparisons = 0;
        let mut first_error = None;

        for result in leaf_results {
            match result {
                Ok(outcome) => {
                    comparisons += outcome.comparisons;
                    failed_comparisons += outcome.failed_comparisons;
                    for candidate in outcome.candidates {
                        best.entry(candidate.g1)
                            .and_modify(|current| {
                                if candidate.precedes(current) {
                                    *current = candidate;
                                }
                            })
                            .or_insert(candidate);
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let triplets: Vec<OrthologTriplet> = best
            .into_values()
            .filter_map(|candidate| {
                let (k, identity_13, identity_23) = candidate.g3?;
                let members = [candidate.g1, candidate.g2, k];
                let cds = [
                    &genomes[0].sequences[members[0]],
                    &genomes[1].sequences[members[1]],
                    &genomes[2].sequences[members[2]],
                ];
                Some(OrthologTriplet {
                    members,
                    ids: cds.map(|c| c.id.clone()),
                    sequences: cds.map(|c| c.sequence.clone()),
                    identities: [candidate.identity_12, identity_13, identity_23],
                })
            })
            .collect();

        if self.config.show_progress {
            println!(
                "✅ {} ortholog triplets from {} comparisons in {:.2}s ({} tasks)",
                triplets.len(),
                comparisons,
                start.elapsed().as_secs_f64(),
                total_tasks
            );
        }

        Ok(ClusteringOutcome {
            genome_names: [
                genomes[0].name.clone(),
                genomes[1].name.clone(),
                genomes[2].name.clone(),
            ],
            triplets,
            tasks: total_tasks,
            comparisons,
            failed_comparisons,
        })
    }

    /// Cluster, then append every triplet to `sink`
    pub fn cluster_into(
        &self,
        genomes: &[GenomeSet; 3],
        progress: &dyn ProgressSink,
        sink: &dyn TripletSink,
    ) -> Result<ClusteringOutcome> {
        let outcome = self.cluster(genomes, progress)?;
        for triplet in &outcome.triplets {
            sink.record(triplet)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pairwise::ParasailAligner;
    use crate::output::sink::{MemorySink, NullProgress};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Identity looked up from a table keyed by the two sequences
    struct TableAligner {
        table: HashMap<(Vec<u8>, Vec<u8>), f64>,
        calls: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    }

    impl TableAligner {
        fn new(entries: &[(&str, &str, f64)]) -> Self {
            let mut table = HashMap::new();
            for (a, b, identity) in entries {
                table.insert((a.as_bytes().to_vec(), b.as_bytes().to_vec()), *identity);
                table.insert((b.as_bytes().to_vec(), a.as_bytes().to_vec()), *identity);
            }
            Self {
                table,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl PairwiseAligner for TableAligner {
        fn percent_identity(&self, seq1: &[u8], seq2: &[u8]) -> Result<f64> {
            self.calls.lock().unwrap().push((seq1.to_vec(), seq2.to_vec()));
            if seq1 == seq2 {
                return Ok(100.0);
            }
            self.table
                .get(&(seq1.to_vec(), seq2.to_vec()))
                .copied()
                .ok_or_else(|| TrioError::Alignment("not in table".to_string()))
        }

        fn aligned_pair(&self, seq1: &[u8], seq2: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
            Ok((seq1.to_vec(), seq2.to_vec()))
        }
    }

    fn genomes(g1: &[&str], g2: &[&str], g3: &[&str]) -> [GenomeSet; 3] {
        [
            GenomeSet::from_sequences("g1", g1),
            GenomeSet::from_sequences("g2", g2),
            GenomeSet::from_sequences("g3", g3),
        ]
    }

    fn sequential() -> ClusteringConfig {
        ClusteringConfig {
            fan_out: 1,
            ..ClusteringConfig::default()
        }
    }

    #[test]
    fn test_partition() {
        assert_eq!(partition(10, 4), vec![0..2, 2..4, 4..6, 6..10]);
        assert_eq!(partition(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
        assert_eq!(partition(3, 4), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition(5, 1), vec![0..5]);
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn test_single_identical_sequence() {
        let clusterer = OrthologyClusterer::new(ParasailAligner::default(), ClusteringConfig::default());
        let genomes = genomes(&["ATGCATGC"], &["ATGCATGC"], &["ATGCATGC"]);
        let sink = MemorySink::new();

        let outcome = clusterer.cluster_into(&genomes, &NullProgress, &sink).unwrap();
        assert_eq!(outcome.triplets.len(), 1);
        assert_eq!(outcome.tasks, 1);

        let core = outcome.core_genome();
        for list in &core.members {
            assert_eq!(list, &vec![b"ATGCATGC".to_vec()]);
        }
        assert_eq!(sink.into_triplets().len(), 1);
    }

    #[test]
    fn test_no_backtracking_to_later_genome2_hit() {
        // A~B1 is the first genome-2 hit but no genome-3 sequence matches it;
        // A~B2 would have matched C, yet the search must not fall back.
        let aligner = TableAligner::new(&[
            ("AAAA", "BBB1", 95.0),
            ("AAAA", "BBB2", 99.0),
            ("AAAA", "CCCC", 97.0),
            ("BBB1", "CCCC", 50.0),
            ("BBB2", "CCCC", 98.0),
        ]);
        let clusterer = OrthologyClusterer::new(aligner, sequential());
        let outcome = clusterer
            .cluster(&genomes(&["AAAA"], &["BBB1", "BBB2"], &["CCCC"]), &NullProgress)
            .unwrap();
        assert!(outcome.triplets.is_empty());
    }

    #[test]
    fn test_first_genome3_match_wins() {
        let aligner = TableAligner::new(&[
            ("AAAA", "BBBB", 96.0),
            ("AAAA", "CCC1", 90.0),
            ("AAAA", "CCC2", 95.0),
            ("AAAA", "CCC3", 99.0),
            ("BBBB", "CCC2", 97.0),
            ("BBBB", "CCC3", 99.0),
        ]);
        let clusterer = OrthologyClusterer::new(aligner, sequential());
        let outcome = clusterer
            .cluster(
                &genomes(&["AAAA"], &["BBBB"], &["CCC1", "CCC2", "CCC3"]),
                &NullProgress,
            )
            .unwrap();
        assert_eq!(outcome.triplets.len(), 1);
        assert_eq!(outcome.triplets[0].members, [0, 0, 1]);
        assert_eq!(outcome.triplets[0].identities, [96.0, 95.0, 97.0]);
        // CCC1 fails against genome 1, so (2,3) is never computed for it
        assert_eq!(outcome.failed_comparisons, 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let aligner = TableAligner::new(&[("AAAA", "BBBB", 94.0)]);
        let clusterer = OrthologyClusterer::new(aligner, sequential());
        let outcome = clusterer
            .cluster(&genomes(&["AAAA"], &["BBBB"], &["AAAA"]), &NullProgress)
            .unwrap();
        assert!(outcome.triplets.is_empty());
    }

    #[test]
    fn test_failed_comparison_is_no_match() {
        // ZZZZ is missing from the table: the aligner errors, the search goes on
        let aligner = TableAligner::new(&[("AAAA", "BBBB", 99.0), ("BBBB", "AAAA", 99.0)]);
        let clusterer = OrthologyClusterer::new(aligner, sequential());
        let outcome = clusterer
            .cluster(&genomes(&["AAAA"], &["ZZZZ", "BBBB"], &["AAAA"]), &NullProgress)
            .unwrap();
        assert_eq!(outcome.failed_comparisons, 1);
        assert_eq!(outcome.triplets.len(), 1);
        assert_eq!(outcome.triplets[0].members, [0, 1, 0]);
    }

    #[test]
    fn test_partitioned_search_matches_sequential() {
        // Scores chosen so that several slices of genome 2 and 3 produce candidates
        let g1 = ["AAAA", "AAAT", "AATT", "ATTT", "TTTT"];
        let g2 = ["CCCC", "AAAA", "AAAT", "GGGG", "AATT", "TTTT", "AAAA"];
        let g3 = ["GGGG", "TTTT", "AAAA", "AAAT", "CCCC", "AATT"];
        let aligner = || TableAligner::new(&[]);

        let expected = OrthologyClusterer::new(aligner(), sequential())
            .cluster(&genomes(&g1, &g2, &g3), &NullProgress)
            .unwrap();

        for fan_out in [2, 3, 4, 8] {
            let config = ClusteringConfig {
                fan_out,
                ..ClusteringConfig::default()
            };
            let outcome = OrthologyClusterer::new(aligner(), config)
                .cluster(&genomes(&g1, &g2, &g3), &NullProgress)
                .unwrap();
            assert_eq!(outcome.triplets, expected.triplets, "fan-out {}", fan_out);
        }

        // Only identical sequences reach 100%: each genome-1 sequence pairs with
        // its first copy in genomes 2 and 3
        let members: Vec<_> = expected.triplets.iter().map(|t| t.members).collect();
        assert_eq!(
            members,
            vec![[0, 1, 2], [1, 2, 3], [2, 4, 5], [4, 5, 1]]
        );
    }

    #[test]
    fn test_genome1_recorded_once() {
        let g = ["ATGCATGC", "ATGCATGC", "ATGCATGC"];
        let config = ClusteringConfig {
            fan_out: 2,
            ..ClusteringConfig::default()
        };
        let outcome = OrthologyClusterer::new(TableAligner::new(&[]), config)
            .cluster(&genomes(&g, &g, &g), &NullProgress)
            .unwrap();
        let firsts: Vec<_> = outcome.triplets.iter().map(|t| t.members[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
        // every genome-1 sequence takes the first genome-2 and genome-3 copies
        assert!(outcome.triplets.iter().all(|t| t.members[1] == 0 && t.members[2] == 0));
    }

    #[test]
    fn test_empty_genome_is_fatal() {
        let clusterer = OrthologyClusterer::new(TableAligner::new(&[]), sequential());
        let genomes = genomes(&["AAAA"], &[], &["AAAA"]);
        assert!(matches!(
            clusterer.cluster(&genomes, &NullProgress),
            Err(TrioError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_empty_sequence_is_fatal() {
        let clusterer = OrthologyClusterer::new(ParasailAligner::default(), sequential());
        let genomes = genomes(&["", "ATGC"], &["", "ATGC"], &["ATGC"]);
        assert!(matches!(
            clusterer.cluster(&genomes, &NullProgress),
            Err(TrioError::EmptyInput(_))
        ));
    }

    /// Fails every comparison involving `NNNN` with a fatal error
    struct FatalAligner;

    impl PairwiseAligner for FatalAligner {
        fn percent_identity(&self, seq1: &[u8], seq2: &[u8]) -> Result<f64> {
            if seq1 == b"NNNN" || seq2 == b"NNNN" {
                return Err(TrioError::EmptyInput("no aligned columns".to_string()));
            }
            Ok(if seq1 == seq2 { 100.0 } else { 0.0 })
        }

        fn aligned_pair(&self, seq1: &[u8], seq2: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
            Ok((seq1.to_vec(), seq2.to_vec()))
        }
    }

    #[test]
    fn test_fatal_aligner_error_aborts() {
        let genomes = genomes(&["AAAA", "CCCC"], &["AAAA", "CCCC"], &["NNNN", "AAAA"]);
        for fan_out in [1, 2] {
            let config = ClusteringConfig {
                fan_out,
                ..ClusteringConfig::default()
            };
            let result = OrthologyClusterer::new(FatalAligner, config).cluster(&genomes, &NullProgress);
            assert!(matches!(result, Err(TrioError::EmptyInput(_))), "fan-out {}", fan_out);
        }
    }

    #[test]
    fn test_cluster_into_records_in_genome1_order() {
        let g1 = ["TTTT", "AAAA", "CCCC"];
        let g2 = ["CCCC", "AAAA", "TTTT"];
        let g3 = ["AAAA", "TTTT", "CCCC"];
        let config = ClusteringConfig {
            fan_out: 3,
            ..ClusteringConfig::default()
        };
        let sink = MemorySink::new();
        let outcome = OrthologyClusterer::new(TableAligner::new(&[]), config)
            .cluster_into(&genomes(&g1, &g2, &g3), &NullProgress, &sink)
            .unwrap();

        let recorded = sink.into_triplets();
        assert_eq!(recorded, outcome.triplets);
        let members: Vec<_> = recorded.iter().map(|t| t.members).collect();
        assert_eq!(members, vec![[0, 2, 1], [1, 1, 0], [2, 0, 2]]);
    }

    #[test]
    fn test_concatenate_core_genome() {
        let core = CoreGenome {
            names: ["a".to_string(), "b".to_string(), "c".to_string()],
            members: [
                vec![b"AT".to_vec(), b"GC".to_vec()],
                vec![b"AA".to_vec(), b"GG".to_vec()],
                vec![b"TT".to_vec(), b"CC".to_vec()],
            ],
        };
        let joined = core.concatenate();
        assert_eq!(joined.get("a"), Some(&b"ATGC"[..]));
        assert_eq!(joined.get("c"), Some(&b"TTCC"[..]));
        assert_eq!(joined.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
