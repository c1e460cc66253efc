// genome.rs - Genome discovery and coding sequence loading

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bio::io::fasta;

use super::sequence::{validate_sequence, Alphabet, CodingSequence};
use crate::error::{Result, TrioError};

/// Number of genomes compared by the pipeline
pub const GENOME_COUNT: usize = 3;

/// The coding sequences of one genome, in file order
#[derive(Debug, Clone)]
pub struct GenomeSet {
    pub name: String,
    pub sequences: Vec<CodingSequence>,
}

impl GenomeSet {
    pub fn new(name: impl Into<String>, sequences: Vec<CodingSequence>) -> Self {
        Self {
            name: name.into(),
            sequences,
        }
    }

    /// Build from bare sequences, ids are generated from the position
    pub fn from_sequences<S: AsRef<[u8]>>(name: impl Into<String>, sequences: &[S]) -> Self {
        let name = name.into();
        let sequences = sequences
            .iter()
            .enumerate()
            .map(|(i, s)| CodingSequence::new(format!("{}_{}", name, i + 1), s.as_ref()))
            .collect();
        Self { name, sequences }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).sum()
    }

    /// Load all records of a FASTA file; sequences are upper-cased
    pub fn from_fasta(name: impl Into<String>, fasta_path: &Path) -> Result<Self> {
        let file = File::open(fasta_path).map_err(|e| TrioError::io(e, fasta_path))?;
        let reader = fasta::Reader::new(BufReader::new(file));

        let mut sequences = Vec::new();
        for record_result in reader.records() {
            let record = record_result.map_err(|e| TrioError::io(e, fasta_path))?;
            let sequence = record.seq().to_ascii_uppercase();
            sequences.push(CodingSequence::new(record.id(), sequence));
        }

        Ok(Self::new(name, sequences))
    }

    /// Every sequence must be non-empty and drawn from `alphabet`
    pub fn validate(&self, alphabet: Alphabet) -> Result<()> {
        if self.sequences.is_empty() {
            return Err(TrioError::EmptyInput(format!(
                "genome '{}' has no coding sequences",
                self.name
            )));
        }
        for cds in &self.sequences {
            let context = format!("genome '{}', sequence '{}'", self.name, cds.id);
            if cds.is_empty() {
                return Err(TrioError::EmptyInput(context));
            }
            validate_sequence(&cds.sequence, alphabet, &context)?;
        }
        Ok(())
    }
}

/// Load one genome per sub-directory of `root`, each holding `cds_file_name`.
///
/// Sub-directories are visited in name order so that runs are reproducible.
pub fn discover_genomes(root: &Path, cds_file_name: &str) -> Result<Vec<GenomeSet>> {
    let entries = std::fs::read_dir(root).map_err(|e| TrioError::io(e, root))?;

    let mut genome_dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TrioError::io(e, root))?;
        let path = entry.path();
        if path.is_dir() && path.join(cds_file_name).is_file() {
            genome_dirs.push(path);
        }
    }
    genome_dirs.sort();

    if genome_dirs.len() != GENOME_COUNT {
        return Err(TrioError::InvalidInput(format!(
            "expected {} genome directories containing '{}' in {}, found {}",
            GENOME_COUNT,
            cds_file_name,
            root.display(),
            genome_dirs.len()
        )));
    }

    let mut genomes = Vec::with_capacity(GENOME_COUNT);
    for dir in genome_dirs {
        let name = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| TrioError::InvalidInput(format!("Invalid genome directory: {}", dir.display())))?;
        let genome = GenomeSet::from_fasta(name, &dir.join(cds_file_name))?;
        println!("  📄 {}: {} coding sequences loaded", genome.name, genome.len());
        genomes.push(genome);
    }

    Ok(genomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_genome(root: &Path, name: &str, content: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cds.fna"), content).unwrap();
    }

    #[test]
    fn test_from_sequences_ids() {
        let genome = GenomeSet::from_sequences("ecoli", &["ATG", "ATGC"]);
        assert_eq!(genome.len(), 2);
        assert_eq!(genome.sequences[1].id, "ecoli_2");
        assert_eq!(genome.total_length(), 7);
    }

    #[test]
    fn test_validate() {
        let genome = GenomeSet::from_sequences("g", &["ATGC", "ATXC"]);
        assert!(matches!(
            genome.validate(Alphabet::Dna),
            Err(TrioError::InvalidSymbol { position: 2, .. })
        ));
        let empty = GenomeSet::new("g", Vec::new());
        assert!(matches!(empty.validate(Alphabet::Dna), Err(TrioError::EmptyInput(_))));
    }

    #[test]
    fn test_discover_genomes_sorted() {
        let root = tempfile::tempdir().unwrap();
        write_genome(root.path(), "strain_b", ">b1\nATGC\nATGC\n>b2\nGGCC\n");
        write_genome(root.path(), "strain_a", ">a1\natgcatgc\n");
        write_genome(root.path(), "strain_c", ">c1\nATGCATGC\n");
        fs::create_dir_all(root.path().join("notes")).unwrap();

        let genomes = discover_genomes(root.path(), "cds.fna").unwrap();
        let names: Vec<_> = genomes.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["strain_a", "strain_b", "strain_c"]);
        assert_eq!(genomes[0].sequences[0].sequence, b"ATGCATGC".to_vec());
        assert_eq!(genomes[1].len(), 2);
        assert_eq!(genomes[1].sequences[0].sequence, b"ATGCATGC".to_vec());
    }

    #[test]
    fn test_discover_requires_three_genomes() {
        let root = tempfile::tempdir().unwrap();
        write_genome(root.path(), "only", ">x\nATGC\n");
        assert!(matches!(
            discover_genomes(root.path(), "cds.fna"),
            Err(TrioError::InvalidInput(_))
        ));
    }
}
