// main.rs - CLI entry point

use std::time::Instant;

use cgtrio::cli::Config;
use cgtrio::data::NamedSequences;
use cgtrio::pipeline::{load_genomes, Pipeline, PipelineOptions, PipelineStep, ALIGNMENT_FILE, CORE_GENOME_FILE};
use cgtrio::prelude::*;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let validation_result = validate_args(&args)?;
    let options = validation_result.pipeline_options(&args, &command_line);

    println!("🚀 {}", cgtrio::get_info());
    println!("🪜 Step: {}", options.step);

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        println!("🧵 Threads: {}", n);
    } else {
        let num_threads = rayon::current_num_threads();
        println!("🧵 Threads: {} (auto-detected)", num_threads);
    }

    if args.dry_run {
        return run_dry_run(&options);
    }

    let total_start = Instant::now();
    let summary = Pipeline::new(options)
        .run()
        .map_err(|e| e.to_string())?;

    println!();
    println!("📋 Run summary");
    if summary.triplets > 0 {
        println!("   Ortholog triplets: {}", summary.triplets);
    }
    if let (Some(score), Some(length)) = (summary.alignment_score, summary.alignment_length) {
        println!("   Alignment: score {} over {} columns", score, length);
    }
    for tree in &summary.trees {
        println!("   {}: {}", tree.method, tree.newick);
    }
    println!("⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    println!("🔧 Command: {}", command_line);
    Ok(())
}

/// Load and check every input the selected step needs, then stop
fn run_dry_run(options: &PipelineOptions) -> Result<(), String> {
    println!("🔍 Dry run: validating inputs only");

    match options.step {
        PipelineStep::Cluster | PipelineStep::All => {
            let genomes = load_genomes(&options.input_dir, &options.cds_file, options.alphabet)
                .map_err(|e| e.to_string())?;
            let tasks: usize = genomes
                .iter()
                .map(|g| g.len().min(options.clustering.fan_out))
                .product();
            for genome in &genomes {
                println!(
                    "   🧬 {}: {} sequences, {} symbols",
                    genome.name,
                    genome.len(),
                    genome.total_length()
                );
            }
            println!("   🧩 Parallel tasks: {}", tasks);
        }
        PipelineStep::Align => {
            let core = NamedSequences::read(&options.output_path(CORE_GENOME_FILE))
                .map_err(|e| e.to_string())?;
            for record in core.iter() {
                println!("   🧬 {}: {} symbols", record.name, record.sequence.len());
            }
        }
        PipelineStep::Tree => {
            let aligned = NamedSequences::read(&options.output_path(ALIGNMENT_FILE))
                .map_err(|e| e.to_string())?;
            let columns = validate_aligned(aligned.rows(), options.alphabet)
                .map_err(|e| e.to_string())?;
            println!("   🧬 {} aligned sequences, {} columns", aligned.len(), columns);
        }
    }

    println!("   Metric: {}", options.metric.description());
    println!("   Tree method: {}", options.tree_method);
    println!("✅ Dry run complete: inputs are valid");
    Ok(())
}
