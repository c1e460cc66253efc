// pipeline.rs - Stage orchestration: cluster -> concatenate -> align -> tree

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use crate::core::orthology::{ClusteringConfig, OrthologyClusterer};
use crate::core::pairwise::ParasailAligner;
use crate::core::phylogeny::{select_variable_sites, PhylogenyBuilder, TreeMethod};
use crate::core::triple::TripleAligner;
use crate::core::{AlignmentConfig, DistanceMetric};
use crate::data::{discover_genomes, validate_aligned, validate_sequence, Alphabet, GenomeSet, NamedSequences};
use crate::error::{Result, TrioError};
use crate::output::sink::{CoreGenomeFileSink, NullProgress, ProgressSink, ReportDirSink};
use crate::output::{tree_path, write_matrix, write_tree, GenomeSummary, MatrixFormat, RunSummary, TreeSummary};

pub const CORE_GENOME_FILE: &str = "core_genome.fasta";
pub const ALIGNMENT_FILE: &str = "core_genome_alignment.fasta";
pub const SELECTED_SITES_FILE: &str = "selected_sites.fasta";
pub const SUMMARY_FILE: &str = "summary.json";

/// Which stages to run; later stages read the files earlier ones wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Cluster,
    Align,
    Tree,
    All,
}

impl PipelineStep {
    fn runs_cluster(&self) -> bool {
        matches!(self, PipelineStep::Cluster | PipelineStep::All)
    }

    fn runs_align(&self) -> bool {
        matches!(self, PipelineStep::Align | PipelineStep::All)
    }

    fn runs_tree(&self) -> bool {
        matches!(self, PipelineStep::Tree | PipelineStep::All)
    }
}

impl FromStr for PipelineStep {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cluster" => Ok(PipelineStep::Cluster),
            "align" => Ok(PipelineStep::Align),
            "tree" => Ok(PipelineStep::Tree),
            "all" => Ok(PipelineStep::All),
            _ => Err(format!(
                "Invalid step: {}. Valid options: cluster, align, tree, all",
                s
            )),
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::Cluster => "cluster",
            PipelineStep::Align => "align",
            PipelineStep::Tree => "tree",
            PipelineStep::All => "all",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    pub cds_file: String,
    pub output_dir: PathBuf,
    /// Per-task scan reports; `None` disables them
    pub report_dir: Option<PathBuf>,
    pub step: PipelineStep,
    pub alphabet: Alphabet,
    pub clustering: ClusteringConfig,
    pub scoring: AlignmentConfig,
    pub tree_method: TreeMethod,
    pub metric: DistanceMetric,
    pub seed: Option<u64>,
    pub matrix_format: MatrixFormat,
    /// Build trees from the variable columns only
    pub tree_on_selected_sites: bool,
    pub exclude_gap_sites: bool,
    pub command_line: String,
}

impl PipelineOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            cds_file: "cds.fna".to_string(),
            output_dir: output_dir.into(),
            report_dir: None,
            step: PipelineStep::All,
            alphabet: Alphabet::Dna,
            clustering: ClusteringConfig::default(),
            scoring: AlignmentConfig::default(),
            tree_method: TreeMethod::Both,
            metric: DistanceMetric::default(),
            seed: None,
            matrix_format: MatrixFormat::Tsv,
            tree_on_selected_sites: false,
            exclude_gap_sites: false,
            command_line: String::new(),
        }
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the selected stages and write `summary.json`
    pub fn run(&self) -> Result<RunSummary> {
        let opts = &self.options;
        let mut summary = RunSummary::new(&opts.command_line);
        let start = Instant::now();

        let concatenated = if opts.step.runs_cluster() {
            Some(self.cluster_stage(&mut summary)?)
        } else {
            None
        };

        let aligned = if opts.step.runs_align() {
            let concatenated = match concatenated {
                Some(c) => c,
                None => NamedSequences::read(&opts.output_path(CORE_GENOME_FILE))?,
            };
            Some(self.align_stage(&concatenated, &mut summary)?)
        } else {
            None
        };

        if opts.step.runs_tree() {
            let aligned = match aligned {
                Some(a) => a,
                None => NamedSequences::read(&opts.output_path(ALIGNMENT_FILE))?,
            };
            self.tree_stage(&aligned, &mut summary)?;
        }

        let summary_path = opts.output_path(SUMMARY_FILE);
        summary.write(&summary_path)?;
        println!("📊 Summary written to: {}", summary_path.display());
        println!("⏱️  Pipeline finished in {:.2}s", start.elapsed().as_secs_f64());
        Ok(summary)
    }

    /// Load genomes, search ortholog triplets, write the core genome files
    pub fn cluster_stage(&self, summary: &mut RunSummary) -> Result<NamedSequences> {
        let opts = &self.options;
        println!("🧬 Loading genomes from: {}", opts.input_dir.display());
        let genomes = load_genomes(&opts.input_dir, &opts.cds_file, opts.alphabet)?;

        println!(
            "🔍 Searching ortholog triplets (identity > {}%, fan-out {})",
            opts.clustering.identity_threshold, opts.clustering.fan_out
        );
        let names = genomes.each_ref().map(|g| g.name.clone());
        let sink = CoreGenomeFileSink::create(&opts.output_dir, &names)?;
        let progress: Box<dyn ProgressSink> = match &opts.report_dir {
            Some(dir) => Box::new(ReportDirSink::create(dir)?),
            None => Box::new(NullProgress),
        };

        let clusterer = OrthologyClusterer::new(
            ParasailAligner::new(opts.alphabet),
            opts.clustering.clone(),
        );
        let outcome = clusterer.cluster_into(&genomes, progress.as_ref(), &sink)?;
        sink.flush()?;

        if outcome.failed_comparisons > 0 {
            println!(
                "⚠️  {} pairwise comparisons failed and were treated as non-matching",
                outcome.failed_comparisons
            );
        }
        println!("✅ Core genome: {} ortholog triplets", outcome.triplets.len());

        let concatenated = outcome.core_genome().concatenate();
        let core_path = opts.output_path(CORE_GENOME_FILE);
        concatenated.write(&core_path)?;
        println!("💾 Concatenated core genomes written to: {}", core_path.display());

        summary.genomes = genomes
            .iter()
            .map(|g| GenomeSummary {
                name: g.name.clone(),
                sequences: g.len(),
                total_length: g.total_length(),
                core_genome_length: concatenated.get(&g.name).map_or(0, |s| s.len()),
            })
            .collect();
        summary.triplets = outcome.triplets.len();
        summary.tasks = outcome.tasks;
        summary.comparisons = outcome.comparisons;
        summary.failed_comparisons = outcome.failed_comparisons;

        Ok(concatenated)
    }

    /// Triple-align the concatenated core genomes and extract variable sites
    pub fn align_stage(&self, concatenated: &NamedSequences, summary: &mut RunSummary) -> Result<NamedSequences> {
        let opts = &self.options;
        let rows: Vec<(&str, &[u8])> = concatenated.rows().collect();
        let [(n1, s1), (n2, s2), (n3, s3)] = rows.as_slice() else {
            return Err(TrioError::InvalidInput(format!(
                "alignment needs exactly 3 core genomes, got {}",
                rows.len()
            )));
        };
        for (name, seq) in &rows {
            if seq.is_empty() {
                return Err(TrioError::EmptyInput(format!("core genome '{}' is empty", name)));
            }
            validate_sequence(seq, opts.alphabet, &format!("core genome '{}'", name))?;
        }

        println!(
            "🧮 Aligning core genomes ({} x {} x {} symbols, {})",
            s1.len(),
            s2.len(),
            s3.len(),
            opts.scoring.description.as_deref().unwrap_or("custom scoring")
        );
        let start = Instant::now();
        let triple = TripleAligner::new(opts.scoring.clone()).align(s1, s2, s3)?;
        println!(
            "✅ Alignment score {} over {} columns in {:.2}s",
            triple.score,
            triple.len(),
            start.elapsed().as_secs_f64()
        );

        let [r1, r2, r3] = triple.rows;
        let aligned: NamedSequences = [
            (n1.to_string(), r1),
            (n2.to_string(), r2),
            (n3.to_string(), r3),
        ]
        .into_iter()
        .collect();
        let columns = validate_aligned(aligned.rows(), opts.alphabet)?;

        let alignment_path = opts.output_path(ALIGNMENT_FILE);
        aligned.write(&alignment_path)?;
        println!("💾 Alignment written to: {}", alignment_path.display());

        let selected = select_variable_sites(&aligned, opts.exclude_gap_sites)?;
        let sites_path = opts.output_path(SELECTED_SITES_FILE);
        selected.write(&sites_path)?;
        let site_count = selected.iter().next().map_or(0, |s| s.sequence.len());
        println!("💾 {} variable sites written to: {}", site_count, sites_path.display());

        summary.alignment_score = Some(triple.score);
        summary.alignment_length = Some(columns);
        summary.selected_sites = Some(site_count);

        Ok(aligned)
    }

    /// Distance matrix and trees from the aligned core genomes
    pub fn tree_stage(&self, aligned: &NamedSequences, summary: &mut RunSummary) -> Result<()> {
        let opts = &self.options;
        validate_aligned(aligned.rows(), opts.alphabet)?;

        let input = if opts.tree_on_selected_sites {
            println!("🔬 Building trees from variable sites only");
            select_variable_sites(aligned, opts.exclude_gap_sites)?
        } else {
            aligned.clone()
        };

        let builder = PhylogenyBuilder::new(opts.metric, opts.seed);
        println!("🌿 Distance metric: {}", opts.metric.description());
        let matrix = builder.distance_matrix(&input)?;
        let matrix_path = opts.output_path(&format!("distances.{}", opts.matrix_format.extension()));
        write_matrix(&matrix_path, opts.matrix_format, &matrix, &opts.command_line)?;

        for (method, tree) in builder.build(opts.tree_method, &input)? {
            println!("🌳 {}: {}", method, tree);
            write_tree(&tree_path(&opts.output_dir, method), &tree)?;
            summary.trees.push(TreeSummary {
                method,
                newick: tree.newick(),
            });
        }

        summary.distance_metric = Some(opts.metric.to_string());
        summary.distance_matrix = Some(matrix);
        Ok(())
    }
}

/// Discover the three genomes and check them before any parallel work starts
pub fn load_genomes(root: &Path, cds_file: &str, alphabet: Alphabet) -> Result<[GenomeSet; 3]> {
    let genomes = discover_genomes(root, cds_file)?;
    for genome in &genomes {
        genome.validate(alphabet)?;
    }
    let count = genomes.len();
    genomes.try_into().map_err(|_| {
        TrioError::InvalidInput(format!("expected 3 genomes, found {}", count))
    })
}
