// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.input.is_none() {
            self.input = config.input;
        }
        if self.output.is_none() {
            self.output = config.output;
        }
        if self.report_dir.is_none() {
            self.report_dir = config.report_dir;
        }

        // String settings (only override defaults, not explicit CLI values)
        merge_default(&mut self.cds_file, "cds.fna", config.cds_file);
        merge_default(&mut self.step, "all", config.step);
        merge_default(&mut self.alphabet, "dna", config.alphabet);
        merge_default(&mut self.alignment_mode, "dna", config.alignment_mode);
        merge_default(&mut self.tree_method, "both", config.tree_method);
        merge_default(&mut self.metric, "jaccard:100", config.metric);
        merge_default(&mut self.format, "tsv", config.format);

        // Ortholog search (only override defaults)
        if let Some(identity) = config.identity {
            if self.identity == 94.0 {
                self.identity = identity;
            }
        }
        if let Some(fan_out) = config.fan_out {
            if self.fan_out == 4 {
                self.fan_out = fan_out;
            }
        }

        // Alignment settings
        if self.match_score.is_none() {
            self.match_score = config.match_score;
        }
        if self.mismatch_score.is_none() {
            self.mismatch_score = config.mismatch_score;
        }
        if self.gap_penalty.is_none() {
            self.gap_penalty = config.gap_penalty;
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.seed.is_none() {
            self.seed = config.seed;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.selected_sites && config.selected_sites.unwrap_or(false) {
            self.selected_sites = true;
        }
        if !self.exclude_gap_sites && config.exclude_gap_sites.unwrap_or(false) {
            self.exclude_gap_sites = true;
        }
        if !self.progress && config.progress.unwrap_or(false) {
            self.progress = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}

fn merge_default(value: &mut String, default: &str, from_config: Option<String>) {
    if value == default {
        if let Some(v) = from_config {
            *value = v;
        }
    }
}
