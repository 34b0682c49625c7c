//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use edge_core::generate_default_config;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(none, using defaults)"),
    }

    let content = ctx
        .config
        .to_toml()
        .context("Failed to serialize configuration")?;
    println!("{}", content);

    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("edge.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let errors = match ctx.config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    let mut warnings: Vec<String> = Vec::new();
    if ctx.config.router.default_locale.is_none() {
        warnings.push(
            "router.default_locale is not set; requests without a known locale get 503".to_string(),
        );
    }
    if ctx.config.static_paths.content_types.is_empty() {
        warnings.push("no static_paths.content_types; every page renders dynamically".to_string());
    }

    if ctx.output.is_json() {
        let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
        ctx.output.json(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
            "warnings": warnings,
        }));
    } else {
        for error in &errors {
            ctx.output.error(&format!("Error: {}", error));
        }
        for warning in &warnings {
            ctx.output.warn(&format!("Warning: {}", warning));
        }
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}
