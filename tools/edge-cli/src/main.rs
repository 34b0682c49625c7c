//! Edge CLI - Command line tool for the edge locale routing layer.
//!
//! Commands:
//! - `edge paths` - Enumerate static paths into a build plan
//! - `edge resolve` - Resolve a locale code to its region
//! - `edge route` - Show the routing decision for a request path
//! - `edge config` - Manage configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edge_observability::{init_logging, LogFormat, LogLevel};

use commands::{ConfigArgs, PathsArgs, ResolveArgs, RouteArgs};

/// Edge CLI - Locale routing, region cache, and static path enumeration
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate static paths for the build pipeline
    Paths(PathsArgs),

    /// Resolve a locale code to its region
    Resolve(ResolveArgs),

    /// Show how a request path would be routed
    Route(RouteArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    let (format, level) = match (cli.json, cli.verbose) {
        (true, true) => (LogFormat::Json, LogLevel::Debug),
        (true, false) => (LogFormat::Json, LogLevel::Warn),
        (false, true) => (LogFormat::Human, LogLevel::Debug),
        (false, false) => (LogFormat::Human, LogLevel::Warn),
    };
    if let Err(e) = init_logging(format, level) {
        output.debug(&e.to_string());
    }

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Paths(args) => commands::paths::run(args, &ctx).await,
        Commands::Resolve(args) => commands::resolve::run(args, &ctx).await,
        Commands::Route(args) => commands::route::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if ctx.output.is_verbose() {
        ctx.output.debug(&format!("metrics: {}", ctx.metrics.snapshot().to_json()));
    }

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
