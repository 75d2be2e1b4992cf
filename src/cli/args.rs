//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Deduction-tree dataset generator for legal reasoning benchmarks
#[derive(Parser, Debug)]
#[command(name = "deductree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config (default: ./deductree.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath, env = "DEDUCTREE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the empty skeleton for a case
    Skeleton {
        /// Case file (JSON object or list; first case is used)
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Write tree JSON here instead of printing the outline
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },

    /// Build, expand and filter every case into dataset records
    Build {
        /// Case file (JSON object or list)
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Output file (default: <output_dir>/dataset.json)
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Consult the configured judge for element leakage
        #[arg(long)]
        use_model_validator: bool,
        /// Replay producer responses from a file ("---" between responses)
        #[arg(long, value_hint = ValueHint::FilePath)]
        replay: Option<PathBuf>,
        /// Build an accept-with-conditions and a fully-reject variant of each case
        #[arg(long)]
        paired: bool,
    },

    /// Derive correct and incorrect chapter trees from an expanded tree
    Filter {
        /// Tree JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        tree: PathBuf,
        /// Output directory (default: <output_dir>)
        #[arg(long, value_hint = ValueHint::DirPath)]
        out_dir: Option<PathBuf>,
    },

    /// Display a tree file
    Show {
        /// Tree JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        tree: PathBuf,
        /// Also list the explicit leaf facts
        #[arg(long)]
        facts: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a commented config template
    Template,

    /// Show config paths
    Path,
}
