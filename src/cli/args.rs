// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// cgtrio - Core genome alignment and phylogeny for three genomes
pub struct Args {
    /// directory holding one sub-directory per genome
    #[argh(option)]
    pub input: Option<String>,

    /// name of the coding sequence file inside each genome directory (default: cds.fna)
    #[argh(option, default = "String::from(\"cds.fna\")")]
    pub cds_file: String,

    /// output directory
    #[argh(option)]
    pub output: Option<String>,

    /// write per-task scan reports into this directory
    #[argh(option)]
    pub report_dir: Option<String>,

    /// pipeline step: cluster, align, tree, all (default: all)
    #[argh(option, default = "String::from(\"all\")")]
    pub step: String,

    /// minimum percent identity, exclusive (default: 94.0)
    #[argh(option, default = "94.0")]
    pub identity: f64,

    /// number of slices per genome for the parallel search (default: 4)
    #[argh(option, default = "4")]
    pub fan_out: usize,

    /// sequence alphabet: dna, protein (default: dna)
    #[argh(option, default = "String::from(\"dna\")")]
    pub alphabet: String,

    /// alignment mode: dna, dna-strict, dna-permissive (default: dna)
    #[argh(option, default = "String::from(\"dna\")")]
    pub alignment_mode: String,

    /// custom match score (overrides preset mode)
    #[argh(option)]
    pub match_score: Option<i32>,

    /// custom mismatch score (overrides preset mode)
    #[argh(option)]
    pub mismatch_score: Option<i32>,

    /// custom per-position gap score (overrides preset mode)
    #[argh(option)]
    pub gap_penalty: Option<i32>,

    /// tree method: nj, upgma, both (default: both)
    #[argh(option, default = "String::from(\"both\")")]
    pub tree_method: String,

    /// distance metric: hamming, transition, jukes-cantor, jaccard[:k], levenshtein (default: jaccard:100)
    #[argh(option, default = "String::from(\"jaccard:100\")")]
    pub metric: String,

    /// seed for consensus tie-breaks (default: random)
    #[argh(option)]
    pub seed: Option<u64>,

    /// distance matrix format: tsv, csv, phylip, nexus (default: tsv)
    #[argh(option, default = "String::from(\"tsv\")")]
    pub format: String,

    /// build trees from variable sites only
    #[argh(switch)]
    pub selected_sites: bool,

    /// drop alignment columns containing gaps from the variable sites
    #[argh(switch)]
    pub exclude_gap_sites: bool,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// show a progress bar during the ortholog search
    #[argh(switch)]
    pub progress: bool,

    /// validate inputs without computation (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
