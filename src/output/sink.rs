// sink.rs - Append-only output channels: scan progress from leaf tasks, triplets after the merge

use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::orthology::OrthologTriplet;
use crate::error::{Result, TrioError};

/// Position of one leaf task inside its three slices, 1-based like the reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPosition {
    pub task: TaskId,
    pub counters: [(usize, usize); 3],
}

/// Path of a leaf task in the fork-join tree: one slice index per genome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub [usize; 3]);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.0[0] + 1, self.0[1] + 1, self.0[2] + 1)
    }
}

/// Receives accepted ortholog triplets in genome-1 order, once all tasks have joined
pub trait TripletSink: Send + Sync {
    fn record(&self, triplet: &OrthologTriplet) -> Result<()>;
}

/// Receives scan progress from leaf tasks
pub trait ProgressSink: Send + Sync {
    fn report(&self, position: &ScanPosition) -> Result<()>;

    /// Called once after every task has joined
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Discards progress lines
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _position: &ScanPosition) -> Result<()> {
        Ok(())
    }
}

/// Keeps triplets in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    triplets: Mutex<Vec<OrthologTriplet>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_triplets(self) -> Vec<OrthologTriplet> {
        self.triplets
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TripletSink for MemorySink {
    fn record(&self, triplet: &OrthologTriplet) -> Result<()> {
        let mut triplets = self
            .triplets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        triplets.push(triplet.clone());
        Ok(())
    }
}

struct CoreGenomeWriters {
    per_genome: Vec<(PathBuf, BufWriter<File>)>,
    clusters_path: PathBuf,
    clusters: csv::Writer<File>,
}

/// Appends each triplet to `core_genome_<name>.txt` (one sequence per line)
/// and to the joint `core_genome_clusters.tsv` table
pub struct CoreGenomeFileSink {
    writers: Mutex<CoreGenomeWriters>,
}

pub const CLUSTERS_FILE: &str = "core_genome_clusters.tsv";

pub fn core_genome_list_path(dir: &Path, genome_name: &str) -> PathBuf {
    dir.join(format!("core_genome_{}.txt", genome_name))
}

impl CoreGenomeFileSink {
    pub fn create(dir: &Path, genome_names: &[String; 3]) -> Result<Self> {
        create_dir_all(dir).map_err(|e| TrioError::io(e, dir))?;

        let mut per_genome = Vec::with_capacity(3);
        for name in genome_names {
            let path = core_genome_list_path(dir, name);
            let file = File::create(&path).map_err(|e| TrioError::io(e, &path))?;
            per_genome.push((path, BufWriter::new(file)));
        }

        let clusters_path = dir.join(CLUSTERS_FILE);
        let mut clusters = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&clusters_path)
            .map_err(|e| TrioError::io(e.into(), &clusters_path))?;
        let header: Vec<String> = genome_names
            .iter()
            .map(|name| format!("{}_id", name))
            .chain(["identity_12", "identity_13", "identity_23"].map(String::from))
            .chain(genome_names.iter().cloned())
            .collect();
        clusters
            .write_record(&header)
            .map_err(|e| TrioError::io(e.into(), &clusters_path))?;

        Ok(Self {
            writers: Mutex::new(CoreGenomeWriters {
                per_genome,
                clusters_path,
                clusters,
            }),
        })
    }

    /// Flush all underlying files
    pub fn flush(&self) -> Result<()> {
        let mut writers = self
            .writers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (path, writer) in writers.per_genome.iter_mut() {
            writer.flush().map_err(|e| TrioError::io(e, path.as_path()))?;
        }
        let clusters_path = writers.clusters_path.clone();
        writers
            .clusters
            .flush()
            .map_err(|e| TrioError::io(e, clusters_path))?;
        Ok(())
    }
}

impl TripletSink for CoreGenomeFileSink {
    fn record(&self, triplet: &OrthologTriplet) -> Result<()> {
        // Interior mutability for `&self`; one lock covers all files
        let mut writers = self
            .writers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for ((path, writer), sequence) in writers.per_genome.iter_mut().zip(&triplet.sequences) {
            writer
                .write_all(sequence)
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| TrioError::io(e, path.as_path()))?;
        }

        let clusters_path = writers.clusters_path.clone();
        writers
            .clusters
            .write_record(triplet_row(triplet))
            .map_err(|e| TrioError::io(e.into(), clusters_path))?;
        Ok(())
    }
}

fn triplet_row(triplet: &OrthologTriplet) -> Vec<String> {
    let mut row: Vec<String> = triplet.ids.to_vec();
    row.extend(triplet.identities.iter().map(|id| format!("{:.2}", id)));
    row.extend(
        triplet
            .sequences
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned()),
    );
    row
}

/// One report file per leaf task: `<dir>/threads_<task>.txt`,
/// one `i/len1   j/len2   k/len3` line per scanned comparison
pub struct ReportDirSink {
    dir: PathBuf,
    files: Mutex<HashMap<TaskId, BufWriter<File>>>,
}

impl ReportDirSink {
    pub fn create(dir: &Path) -> Result<Self> {
        create_dir_all(dir).map_err(|e| TrioError::io(e, dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn report_path(&self, task: TaskId) -> PathBuf {
        self.dir.join(format!("threads_{}.txt", task))
    }
}

impl ProgressSink for ReportDirSink {
    fn report(&self, position: &ScanPosition) -> Result<()> {
        let path = self.report_path(position.task);
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let writer = match files.entry(position.task) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| TrioError::io(e, &path))?;
                entry.insert(BufWriter::new(file))
            }
        };

        let [(c1, n1), (c2, n2), (c3, n3)] = position.counters;
        writeln!(writer, "{}/{}   {}/{}   {}/{}", c1, n1, c2, n2, c3, n3)
            .map_err(|e| TrioError::io(e, &path))
    }

    fn finish(&self) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (task, writer) in files.iter_mut() {
            writer
                .flush()
                .map_err(|e| TrioError::io(e, self.report_path(*task)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplet() -> OrthologTriplet {
        OrthologTriplet {
            members: [0, 2, 1],
            ids: ["a1".to_string(), "b3".to_string(), "c2".to_string()],
            sequences: [b"ATGC".to_vec(), b"ATGC".to_vec(), b"ATGA".to_vec()],
            identities: [100.0, 95.5, 95.5],
        }
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId([0, 3, 1]).to_string(), "1_4_2");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.record(&triplet()).unwrap();
        let triplets = sink.into_triplets();
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].members, [0, 2, 1]);
    }

    #[test]
    fn test_core_genome_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["g1".to_string(), "g2".to_string(), "g3".to_string()];
        let sink = CoreGenomeFileSink::create(dir.path(), &names).unwrap();
        sink.record(&triplet()).unwrap();
        sink.flush().unwrap();

        let g3 = std::fs::read_to_string(core_genome_list_path(dir.path(), "g3")).unwrap();
        assert_eq!(g3, "ATGA\n");

        let clusters = std::fs::read_to_string(dir.path().join(CLUSTERS_FILE)).unwrap();
        let lines: Vec<_> = clusters.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("g1_id\tg2_id\tg3_id"));
        assert_eq!(lines[1], "a1\tb3\tc2\t100.00\t95.50\t95.50\tATGC\tATGC\tATGA");
    }

    #[test]
    fn test_report_dir_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportDirSink::create(dir.path()).unwrap();
        let task = TaskId([1, 0, 2]);
        sink.report(&ScanPosition { task, counters: [(1, 5), (2, 3), (0, 4)] })
            .unwrap();
        sink.report(&ScanPosition { task, counters: [(1, 5), (3, 3), (1, 4)] })
            .unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(sink.report_path(task)).unwrap();
        assert_eq!(content, "1/5   2/3   0/4\n1/5   3/3   1/4\n");
    }
}
