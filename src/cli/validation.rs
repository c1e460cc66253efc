// validation.rs - Input validation utilities

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cli::args::Args;
use crate::core::{AlignmentConfig, ClusteringConfig, DistanceMetric, TreeMethod};
use crate::data::Alphabet;
use crate::output::MatrixFormat;
use crate::pipeline::{PipelineOptions, PipelineStep};

pub struct ValidationResult {
    pub step: PipelineStep,
    pub alphabet: Alphabet,
    pub alignment_config: AlignmentConfig,
    pub tree_method: TreeMethod,
    pub metric: DistanceMetric,
    pub matrix_format: MatrixFormat,
    pub input_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl ValidationResult {
    /// Pipeline options for these arguments
    pub fn pipeline_options(&self, args: &Args, command_line: &str) -> PipelineOptions {
        let mut options = PipelineOptions::new(
            self.input_dir.clone().unwrap_or_default(),
            self.output_dir.clone(),
        );
        options.cds_file = args.cds_file.clone();
        options.report_dir = args.report_dir.as_ref().map(PathBuf::from);
        options.step = self.step;
        options.alphabet = self.alphabet;
        options.clustering = ClusteringConfig {
            identity_threshold: args.identity,
            fan_out: args.fan_out,
            show_progress: args.progress,
        };
        options.scoring = self.alignment_config.clone();
        options.tree_method = self.tree_method;
        options.metric = self.metric;
        options.seed = args.seed;
        options.matrix_format = self.matrix_format;
        options.tree_on_selected_sites = args.selected_sites;
        options.exclude_gap_sites = args.exclude_gap_sites;
        options.command_line = command_line.to_string();
        options
    }
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    let step = PipelineStep::from_str(&args.step)?;
    let alphabet = Alphabet::from_str(&args.alphabet)?;
    let tree_method = TreeMethod::from_str(&args.tree_method)?;
    let metric = DistanceMetric::from_str(&args.metric)?;
    let matrix_format = MatrixFormat::from_str(&args.format)?;

    // Validate and create alignment config
    let alignment_config = if args.match_score.is_some()
        || args.mismatch_score.is_some()
        || args.gap_penalty.is_some()
    {
        // Custom mode
        let defaults = AlignmentConfig::default();
        AlignmentConfig::custom(
            args.match_score.unwrap_or(defaults.match_score),
            args.mismatch_score.unwrap_or(defaults.mismatch_score),
            args.gap_penalty.unwrap_or(defaults.gap_penalty),
        )
    } else {
        // Preset mode
        AlignmentConfig::from_mode(&args.alignment_mode)?
    };

    // Validate thresholds
    if !(0.0..=100.0).contains(&args.identity) {
        return Err("Identity threshold must be between 0 and 100".to_string());
    }
    if args.fan_out == 0 {
        return Err("Fan-out must be at least 1".to_string());
    }
    if let Some(0) = args.threads {
        return Err("Thread count must be at least 1".to_string());
    }

    let output_dir = PathBuf::from(args.output.as_ref().ok_or("--output is required")?);

    // Only the clustering stage reads genomes; later stages read the output directory
    let input_dir = match step {
        PipelineStep::Cluster | PipelineStep::All => {
            let input = args
                .input
                .as_ref()
                .ok_or("--input is required for the cluster and all steps")?;
            let path = PathBuf::from(input);
            if !path.is_dir() {
                return Err(format!("Input directory '{}' does not exist", input));
            }
            Some(path)
        }
        PipelineStep::Align | PipelineStep::Tree => {
            args.input.as_ref().map(PathBuf::from)
        }
    };

    if matches!(step, PipelineStep::Align | PipelineStep::Tree) {
        let needed = match step {
            PipelineStep::Align => crate::pipeline::CORE_GENOME_FILE,
            _ => crate::pipeline::ALIGNMENT_FILE,
        };
        require_file(&output_dir.join(needed), step)?;
    }

    Ok(ValidationResult {
        step,
        alphabet,
        alignment_config,
        tree_method,
        metric,
        matrix_format,
        input_dir,
        output_dir,
    })
}

fn require_file(path: &Path, step: PipelineStep) -> Result<(), String> {
    if path.is_file() {
        Ok(())
    } else {
        Err(format!(
            "Step '{}' needs '{}' from an earlier run",
            step,
            path.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argh::FromArgs;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["cgtrio"], args).unwrap()
    }

    #[test]
    fn test_valid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_str().unwrap();
        let args = parse(&[
            "--input", input, "--output", "out", "--metric", "jc", "--tree-method", "nj",
            "--match-score", "3",
        ]);
        let result = validate_args(&args).unwrap();
        assert_eq!(result.metric, DistanceMetric::JukesCantor);
        assert_eq!(result.tree_method, TreeMethod::NeighborJoining);
        assert_eq!(result.alignment_config.match_score, 3);
        assert_eq!(result.alignment_config.gap_penalty, -2);

        let options = result.pipeline_options(&args, "cgtrio");
        assert_eq!(options.clustering.fan_out, 4);
        assert_eq!(options.step, PipelineStep::All);
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_str().unwrap();

        let args = parse(&["--input", input, "--output", "out", "--metric", "cosine"]);
        assert!(validate_args(&args).is_err());

        let args = parse(&["--input", input, "--output", "out", "--fan-out", "0"]);
        assert!(validate_args(&args).is_err());

        let args = parse(&["--input", input, "--output", "out", "--identity", "101"]);
        assert!(validate_args(&args).is_err());

        let args = parse(&["--input", input]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_tree_step_needs_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().to_str().unwrap();
        let args = parse(&["--output", output, "--step", "tree"]);
        let err = validate_args(&args).err().unwrap();
        assert!(err.contains("core_genome_alignment.fasta"));
    }
}
