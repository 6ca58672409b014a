//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::compiler::OutputStyle;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sassbuild stylesheet build tool CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Source directory path (relative to project root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: sassbuild.toml)
    #[arg(short = 'C', long, default_value = "sassbuild.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Manifest rendering format for the `enqueue` command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    /// HTML `<link>` tags, one per stylesheet (default)
    #[default]
    Html,
    /// JSON array of registration records
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile stale stylesheets into the output directory
    Build {
        /// Compile even when outputs are up to date
        #[arg(short, long)]
        force: bool,

        /// Override the configured output style
        #[arg(long, value_enum)]
        style: Option<OutputStyle>,
    },

    /// Report whether sources are newer than compiled outputs
    Status,

    /// Recompile whenever a source stylesheet changes
    Watch,

    /// Render the registration manifest for compiled stylesheets
    Enqueue {
        /// Manifest format
        #[arg(long, value_enum, default_value = "html")]
        format: ManifestFormat,

        /// Write the manifest to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
