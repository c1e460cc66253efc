// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub input: Option<String>,
    pub cds_file: Option<String>,
    pub output: Option<String>,
    pub report_dir: Option<String>,
    pub step: Option<String>,

    // Ortholog search
    pub identity: Option<f64>,
    pub fan_out: Option<usize>,
    pub alphabet: Option<String>,

    // Alignment settings
    pub alignment_mode: Option<String>,
    pub match_score: Option<i32>,
    pub mismatch_score: Option<i32>,
    pub gap_penalty: Option<i32>,

    // Phylogeny
    pub tree_method: Option<String>,
    pub metric: Option<String>,
    pub seed: Option<u64>,
    pub format: Option<String>,
    pub selected_sites: Option<bool>,
    pub exclude_gap_sites: Option<bool>,

    // Performance
    pub threads: Option<usize>,
    pub progress: Option<bool>,

    // Flags
    pub dry_run: Option<bool>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# cgtrio.toml - Configuration file for cgtrio
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Directory with one sub-directory per genome (exactly three)
input = "/path/to/genomes"

# Coding sequence file inside each genome directory
cds_file = "cds.fna"

# Output directory
output = "results"

# Per-task scan reports (one file per parallel task)
# report_dir = "results/reports"

# Pipeline step: cluster, align, tree, all
step = "all"

# =============================================================================
# ORTHOLOG SEARCH
# =============================================================================

# Pairs must exceed this percent identity
identity = 94.0

# Slices per genome for the parallel search (fan_out^3 tasks)
fan_out = 4

# Sequence alphabet: dna, protein
alphabet = "dna"

# =============================================================================
# ALIGNMENT SETTINGS
# =============================================================================

# Alignment mode: dna, dna-strict, dna-permissive
alignment_mode = "dna"

# Custom scores (overrides preset mode)
# match_score = 2
# mismatch_score = -1
# gap_penalty = -2

# =============================================================================
# PHYLOGENY
# =============================================================================

# Tree method: nj, upgma, both
tree_method = "both"

# Distance metric: hamming, transition, jukes-cantor, jaccard[:k], levenshtein
metric = "jaccard:100"

# Seed for consensus tie-breaks (omit for a random seed)
# seed = 42

# Distance matrix format: tsv, csv, phylip, nexus
format = "tsv"

# Build trees from variable sites only
selected_sites = false

# Drop gap-containing columns from the variable sites
exclude_gap_sites = false

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
threads = 16

# Show a progress bar during the ortholog search
progress = true

# =============================================================================
# FLAGS
# =============================================================================

# Validate inputs without computation (dry run)
dry_run = false
"#
        .to_string()
    }
}
