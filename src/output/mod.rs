// mod.rs - Output formatters module

pub mod sink;

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::phylogeny::{DistanceMatrix, PhyloTree, TreeMethod};
use crate::error::{Result, TrioError};

/// Ensure parent directory exists before creating file
pub fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        create_dir_all(parent).map_err(|e| TrioError::io(e, parent))?;
    }
    Ok(())
}

fn create_writer(file_path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path).map_err(|e| TrioError::io(e, file_path))?;
    Ok(BufWriter::new(file))
}

fn generated_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_distance(d: f64) -> String {
    format!("{:.6}", d)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Tsv,
    Csv,
    Phylip,
    Nexus,
}

impl MatrixFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MatrixFormat::Tsv => "tsv",
            MatrixFormat::Csv => "csv",
            MatrixFormat::Phylip => "phy",
            MatrixFormat::Nexus => "nex",
        }
    }
}

impl std::str::FromStr for MatrixFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(MatrixFormat::Tsv),
            "csv" => Ok(MatrixFormat::Csv),
            "phylip" => Ok(MatrixFormat::Phylip),
            "nexus" => Ok(MatrixFormat::Nexus),
            _ => Err(format!(
                "Unsupported output format: {}. Use: tsv, csv, phylip, nexus",
                s
            )),
        }
    }
}

/// Delimited square matrix with `#` header lines
fn write_delimited(
    file_path: &Path,
    matrix: &DistanceMatrix,
    delimiter: char,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_writer(file_path)?;
    let io = |e: std::io::Error| TrioError::io(e, file_path);

    writeln!(writer, "# Command: {}", command_line).map_err(io)?;
    writeln!(writer, "# Generated: {}", generated_stamp()).map_err(io)?;
    writeln!(writer, "# cgtrio v{}", env!("CARGO_PKG_VERSION")).map_err(io)?;

    write!(writer, "Genome").map_err(io)?;
    for name in matrix.names() {
        write!(writer, "{}{}", delimiter, name).map_err(io)?;
    }
    writeln!(writer).map_err(io)?;

    for (name, row) in matrix.names().iter().zip(matrix.rows()) {
        write!(writer, "{}", name).map_err(io)?;
        for d in row {
            write!(writer, "{}{}", delimiter, format_distance(*d)).map_err(io)?;
        }
        writeln!(writer).map_err(io)?;
    }

    writer.flush().map_err(io)?;
    Ok(())
}

/// Write distance matrix in PHYLIP format (lower triangle)
pub fn write_phylip(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    let mut writer = create_writer(file_path)?;
    let io = |e: std::io::Error| TrioError::io(e, file_path);

    writeln!(writer, "    {}", matrix.len()).map_err(io)?;
    for (i, name) in matrix.names().iter().enumerate() {
        write!(writer, "{:<10}", name).map_err(io)?;
        for j in 0..=i {
            write!(writer, "  {}", format_distance(matrix.get(i, j))).map_err(io)?;
        }
        writeln!(writer).map_err(io)?;
    }

    // Trailing comments; most PHYLIP readers stop after the matrix
    writeln!(writer).map_err(io)?;
    writeln!(writer, "# Command: {}", command_line).map_err(io)?;
    writeln!(writer, "# Generated: {}", generated_stamp()).map_err(io)?;
    writeln!(writer, "# cgtrio v{}", env!("CARGO_PKG_VERSION")).map_err(io)?;

    writer.flush().map_err(io)?;
    Ok(())
}

/// Write distance matrix in NEXUS format
pub fn write_nexus(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    let mut writer = create_writer(file_path)?;
    let io = |e: std::io::Error| TrioError::io(e, file_path);

    writeln!(writer, "#NEXUS").map_err(io)?;
    writeln!(writer, "[Command: {}]", command_line).map_err(io)?;
    writeln!(writer, "[Generated: {}]", generated_stamp()).map_err(io)?;
    writeln!(writer, "[cgtrio v{}]", env!("CARGO_PKG_VERSION")).map_err(io)?;
    writeln!(writer, "BEGIN DISTANCES;").map_err(io)?;
    writeln!(writer, "    DIMENSIONS NTAX={};", matrix.len()).map_err(io)?;
    writeln!(writer, "    FORMAT LABELS LOWER DIAGONAL;").map_err(io)?;
    writeln!(writer, "    MATRIX").map_err(io)?;

    for (i, name) in matrix.names().iter().enumerate() {
        write!(writer, "        {}", name).map_err(io)?;
        for j in 0..i {
            write!(writer, " {}", format_distance(matrix.get(i, j))).map_err(io)?;
        }
        writeln!(writer).map_err(io)?;
    }

    writeln!(writer, "    ;").map_err(io)?;
    writeln!(writer, "END;").map_err(io)?;

    writer.flush().map_err(io)?;
    Ok(())
}

/// Write distance matrix in the specified format
pub fn write_matrix(
    file_path: &Path,
    format: MatrixFormat,
    matrix: &DistanceMatrix,
    command_line: &str,
) -> Result<()> {
    match format {
        MatrixFormat::Tsv => write_delimited(file_path, matrix, '\t', command_line)?,
        MatrixFormat::Csv => write_delimited(file_path, matrix, ',', command_line)?,
        MatrixFormat::Phylip => write_phylip(file_path, matrix, command_line)?,
        MatrixFormat::Nexus => write_nexus(file_path, matrix, command_line)?,
    }
    println!("✅ Distance matrix written to: {}", file_path.display());
    Ok(())
}

pub fn tree_path(dir: &Path, method: TreeMethod) -> PathBuf {
    dir.join(format!("tree_{}.txt", method.label()))
}

/// Tree text on a single line
pub fn write_tree(file_path: &Path, tree: &PhyloTree) -> Result<()> {
    let mut writer = create_writer(file_path)?;
    writeln!(writer, "{}", tree.newick())
        .and_then(|_| writer.flush())
        .map_err(|e| TrioError::io(e, file_path))?;
    println!("🌳 Tree written to: {}", file_path.display());
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct GenomeSummary {
    pub name: String,
    pub sequences: usize,
    pub total_length: usize,
    pub core_genome_length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeSummary {
    pub method: TreeMethod,
    pub newick: String,
}

/// Everything worth keeping about one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub generated: DateTime<Utc>,
    pub command_line: String,
    pub genomes: Vec<GenomeSummary>,
    pub triplets: usize,
    pub tasks: usize,
    pub comparisons: usize,
    pub failed_comparisons: usize,
    pub alignment_score: Option<i32>,
    pub alignment_length: Option<usize>,
    pub selected_sites: Option<usize>,
    pub distance_metric: Option<String>,
    pub distance_matrix: Option<DistanceMatrix>,
    pub trees: Vec<TreeSummary>,
}

impl RunSummary {
    pub fn new(command_line: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated: Utc::now(),
            command_line: command_line.to_string(),
            genomes: Vec::new(),
            triplets: 0,
            tasks: 0,
            comparisons: 0,
            failed_comparisons: 0,
            alignment_score: None,
            alignment_length: None,
            selected_sites: None,
            distance_metric: None,
            distance_matrix: None,
            trees: Vec::new(),
        }
    }

    pub fn write(&self, file_path: &Path) -> Result<()> {
        let mut writer = create_writer(file_path)?;
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| TrioError::io(e.into(), file_path))?;
        writeln!(writer)
            .and_then(|_| writer.flush())
            .map_err(|e| TrioError::io(e, file_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> DistanceMatrix {
        DistanceMatrix::from_values(
            vec!["g1".to_string(), "g2".to_string(), "g3".to_string()],
            vec![
                vec![0.0, 0.25, 0.5],
                vec![0.25, 0.0, 0.125],
                vec![0.5, 0.125, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_tsv_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("distances.tsv");
        write_matrix(&path, MatrixFormat::Tsv, &matrix(), "cgtrio test").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(lines[0], "Genome\tg1\tg2\tg3");
        assert_eq!(lines[2], "g2\t0.250000\t0.000000\t0.125000");
    }

    #[test]
    fn test_phylip_lower_triangle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.phy");
        write_matrix(&path, MatrixFormat::Phylip, &matrix(), "cgtrio test").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "    3");
        assert!(lines[3].starts_with("g3"));
        assert_eq!(lines[3].split_whitespace().count(), 4);
    }

    #[test]
    fn test_nexus_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.nex");
        write_matrix(&path, MatrixFormat::Nexus, &matrix(), "cgtrio test").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#NEXUS"));
        assert!(content.contains("DIMENSIONS NTAX=3;"));
        assert!(content.contains("g3 0.500000 0.125000"));
    }

    #[test]
    fn test_matrix_format_from_str() {
        assert_eq!("PHYLIP".parse::<MatrixFormat>().unwrap(), MatrixFormat::Phylip);
        assert!("xml".parse::<MatrixFormat>().is_err());
    }

    #[test]
    fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let mut summary = RunSummary::new("cgtrio test");
        summary.triplets = 2;
        summary.trees.push(TreeSummary {
            method: TreeMethod::Upgma,
            newick: "(C:1, (A:0.5, B:0.5):1)".to_string(),
        });
        summary.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["triplets"], 2);
        assert_eq!(value["trees"][0]["method"], "upgma");
        assert!(value["alignment_score"].is_null());
    }
}
