//! CLI command implementations.

pub mod config;
pub mod paths;
pub mod resolve;
pub mod route;

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments for the paths command.
#[derive(Args)]
pub struct PathsArgs {
    /// Write the build plan to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only enumerate these content types (repeatable).
    #[arg(short = 't', long = "type")]
    pub types: Vec<String>,

    /// Fail when the backend address is not configured.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Locale code to resolve.
    pub code: String,
}

/// Arguments for the route command.
#[derive(Args)]
pub struct RouteArgs {
    /// Request path, with optional query string.
    pub path: String,

    /// Visitor country, as a CDN geo header would report it.
    #[arg(long)]
    pub country: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration.
    Validate,
}
