//! Command-line interface definition

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "congelo",
    version,
    about = "Freeze Python package trees into C sources holding marshalled bytecode"
)]
pub struct Cli {
    /// Paths to freeze: package directories, single modules, or containers
    /// of independent top-level units
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Directory that receives the bytecode shards and the main.c manifest
    #[arg(long, value_name = "DIR")]
    pub install_dir: PathBuf,

    /// Additionally emit an empty fallback _PyImport_FrozenModules table
    #[arg(long)]
    pub oss: bool,

    /// Explicit configuration file, bypassing discovery
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, includes the traversal trace; -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
