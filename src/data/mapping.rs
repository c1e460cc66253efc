// mapping.rs - Ordered name -> sequence records (two-line FASTA files)

use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bio::io::fasta;

use crate::error::{Result, TrioError};

/// A named sequence, e.g. one genome's core genome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSequence {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Name -> sequence mapping preserving insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedSequences {
    entries: Vec<NamedSequence>,
}

impl NamedSequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the sequence stored under `name`
    pub fn insert(&mut self, name: impl Into<String>, sequence: impl Into<Vec<u8>>) {
        let name = name.into();
        let sequence = sequence.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.sequence = sequence,
            None => self.entries.push(NamedSequence { name, sequence }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.sequence.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedSequence> {
        self.entries.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.sequence.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a mapping file: each record is `>name` followed by its sequence
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TrioError::io(e, path))?;
        let reader = fasta::Reader::new(BufReader::new(file));

        let mut mapping = Self::new();
        for record_result in reader.records() {
            let record = record_result.map_err(|e| TrioError::io(e, path))?;
            mapping.insert(record.id(), record.seq().to_vec());
        }

        if mapping.is_empty() {
            return Err(TrioError::EmptyInput(format!(
                "no records in {}",
                path.display()
            )));
        }
        Ok(mapping)
    }

    /// Write one `>name` line and one sequence line per record
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(|e| TrioError::io(e, parent))?;
        }
        let file = File::create(path).map_err(|e| TrioError::io(e, path))?;
        let mut writer = fasta::Writer::new(BufWriter::new(file));

        for entry in &self.entries {
            writer
                .write(&entry.name, None, &entry.sequence)
                .map_err(|e| TrioError::io(e, path))?;
        }
        writer.flush().map_err(|e| TrioError::io(e, path))?;
        Ok(())
    }
}

impl FromIterator<(String, Vec<u8>)> for NamedSequences {
    fn from_iter<T: IntoIterator<Item = (String, Vec<u8>)>>(iter: T) -> Self {
        let mut mapping = Self::new();
        for (name, sequence) in iter {
            mapping.insert(name, sequence);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut mapping = NamedSequences::new();
        mapping.insert("b", b"AT".to_vec());
        mapping.insert("a", b"GC".to_vec());
        mapping.insert("b", b"TT".to_vec());

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(mapping.get("b"), Some(&b"TT"[..]));
        assert_eq!(mapping.get("c"), None);
    }

    #[test]
    fn test_two_line_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("core_genome.fasta");

        let mapping: NamedSequences = vec![
            ("g1".to_string(), b"ATGC-A".to_vec()),
            ("g2".to_string(), b"ATGCCA".to_vec()),
        ]
        .into_iter()
        .collect();
        mapping.write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, ">g1\nATGC-A\n>g2\nATGCCA\n");
        assert_eq!(NamedSequences::read(&path).unwrap(), mapping);
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fasta");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(NamedSequences::read(&path), Err(TrioError::EmptyInput(_))));
    }
}
