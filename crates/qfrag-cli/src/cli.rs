use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The QFRAG Developers",
    version,
    about = "QFRAG CLI - Graph-based fragmentation of macromolecular structures into \
             bounded-size, chemically valid pieces for divide-and-conquer quantum chemistry.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel fragment growth.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Partition a structure into QM-evaluable fragments.
    Fragment(FragmentArgs),
}

/// Arguments for the `fragment` subcommand.
#[derive(Args, Debug)]
pub struct FragmentArgs {
    // --- Core Arguments ---
    /// Path to the input structure file (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to an optional symmetry-expanded superstructure file (PDB).
    /// It must extend the input structure; buffer atoms beyond the
    /// asymmetric unit are drawn from it.
    #[arg(short = 'e', long, value_name = "PATH")]
    pub expansion: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Clustering Overrides ---
    /// Override the maximum number of residues per cluster.
    #[arg(short, long, value_name = "INT")]
    pub max_residues: Option<usize>,

    /// Override the edge-centrality floor below which components stay whole.
    #[arg(long, value_name = "FLOAT")]
    pub centrality_threshold: Option<f64>,

    /// Interatomic distance below which residues interact, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub contact_cutoff: Option<f64>,

    /// Stop after clustering and report the residue partition only.
    #[arg(long)]
    pub clusters_only: bool,

    // --- Fragment Overrides ---
    /// Grow a second buffer shell around every fragment.
    #[arg(long)]
    pub two_buffers: bool,

    /// Override the alternate-location reconciliation policy.
    #[arg(short = 'a', long = "altloc-method", value_name = "POLICY")]
    pub altloc_method: Option<AltlocMethodArg>,

    // --- Output ---
    /// Directory for per-fragment working files.
    #[arg(short = 'w', long, value_name = "PATH")]
    pub working_dir: Option<PathBuf>,

    /// Write per-fragment structure files.
    #[arg(long)]
    pub save_fragments: bool,

    /// Write the cluster/fragment snapshot set and summary.
    #[arg(long)]
    pub save_clusters: bool,

    // --- Electrostatic Embedding ---
    /// Produce a point-charge file for electrostatic embedding per fragment.
    #[arg(long)]
    pub charge_embedding: bool,

    /// Target quantum-chemistry backend (selects the embedding file format).
    #[arg(long, value_name = "ENGINE")]
    pub qm_engine: Option<QmEngineArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltlocMethodArg {
    Subtract,
    Average,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QmEngineArg {
    Turbomole,
    Terachem,
    Xtb,
    Mopac,
    Orca,
    Gaussian,
}
