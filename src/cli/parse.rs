//! CLI parse: clap types for the gallery binary. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Gallery CLI - manage client-side albums and inspect configuration
#[derive(Parser)]
#[command(name = "gallery")]
#[command(about = "Client-side albums and cache tooling for a paginated media gallery")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage albums
    Album {
        #[command(subcommand)]
        command: AlbumCommands,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum AlbumCommands {
    /// List all albums
    List,
    /// Show one album
    Show {
        /// Album id
        id: String,
    },
    /// Create an album
    Create {
        /// Album name
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename an album
    Rename {
        id: String,
        name: String,
    },
    /// Set or clear an album's description
    Describe {
        id: String,
        /// New description (omit to clear)
        text: Option<String>,
    },
    /// Delete an album
    Delete {
        id: String,
    },
    /// Add assets to an album
    Add {
        id: String,
        #[arg(required = true)]
        assets: Vec<i64>,
    },
    /// Remove assets from an album
    Remove {
        id: String,
        #[arg(required = true)]
        assets: Vec<i64>,
    },
    /// List albums containing an asset
    Containing {
        asset: i64,
    },
}
