//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Packyard - package registry that builds on demand
///
/// Serves packaged artifacts for every tag of a package repository,
/// building each (package, version) once in a disposable container.
#[derive(Parser, Debug)]
#[command(name = "packyard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PACKYARD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP registry
    Serve(ServeArgs),

    /// Build a package version into the store
    Build(BuildArgs),

    /// Write an artifact to a file or stdout, building it if needed
    Fetch(FetchArgs),

    /// List version tags of the package repository
    Tags,

    /// List packages of a version
    Packages(PackagesArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Keep builds and cache entries in memory only
    #[arg(long)]
    pub ephemeral: bool,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Package as name or name@version (defaults to latest)
    pub package: String,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Package as name or name@version (defaults to latest)
    pub package: String,

    /// Artifact file name (defaults to the primary artifact)
    pub path: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the packages command
#[derive(Parser, Debug)]
pub struct PackagesArgs {
    /// Version to list (defaults to latest)
    #[arg(value_name = "VERSION")]
    pub at: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
