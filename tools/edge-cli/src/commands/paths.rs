//! Enumerate static paths into a build plan.
//!
//! This is the build pipeline hook. Enumeration failures never fail the
//! command: affected content types are planned as dynamic instead.

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use edge_cache::{RefreshPolicy, RegionResolver};
use edge_data::HttpBackend;
use edge_static::{BuildPlan, ContentType, EnumerationSettings, StaticPathEnumerator};

use super::PathsArgs;
use crate::context::Context;
use crate::output::{format_millis, status_badge};

/// Run the paths command.
pub async fn run(args: PathsArgs, ctx: &Context) -> Result<()> {
    let content_types = select_types(ctx.content_types(), &args.types)?;

    if content_types.is_empty() {
        ctx.output
            .warn("No content types configured under [[static_paths.content_types]]");
    }

    ctx.output.header("Enumerating static paths");

    let plan = match ctx.backend() {
        Ok(backend) => build_plan(ctx, backend, &content_types).await,
        Err(err) if args.strict => {
            return Err(err).context("Cannot enumerate static paths");
        }
        Err(err) => {
            ctx.output
                .warn(&format!("{}; every content type will render dynamically", err));
            BuildPlan::all_dynamic(&content_types, &err.to_string())
        }
    };

    let json = plan.to_json().context("Failed to serialize build plan")?;
    match &args.output {
        Some(path) => {
            let path = ctx.resolve_path(path);
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ctx.output.success(&format!("Wrote {}", path.display()));
        }
        None => println!("{}", json),
    }

    print_summary(&plan, ctx);
    Ok(())
}

async fn build_plan(
    ctx: &Context,
    backend: Arc<HttpBackend>,
    content_types: &[ContentType],
) -> BuildPlan {
    let settings = EnumerationSettings::from_config(&ctx.config.static_paths);
    ctx.output.debug(&format!(
        "timeout {}s, page size {}, {} retries per page",
        settings.timeout.as_secs(),
        settings.page_size,
        settings.retry.max_attempts
    ));

    let mut enumerator = StaticPathEnumerator::new(backend.clone(), settings)
        .with_metrics(Arc::clone(&ctx.metrics));

    if let Some(param) = &ctx.config.static_paths.locale_param {
        let resolver = RegionResolver::with_metrics(
            backend,
            RefreshPolicy::from_config(&ctx.config),
            Arc::clone(&ctx.metrics),
        );

        match resolver.known_locales().await {
            Ok(locales) => {
                ctx.output
                    .debug(&format!("expanding paths over {} locales", locales.len()));
                enumerator = enumerator.with_locales(param, locales);
            }
            Err(err) => {
                ctx.output.warn(&format!("Cannot list locales: {}", err));
                return BuildPlan::all_dynamic(
                    content_types,
                    &format!("locale list unavailable: {}", err),
                );
            }
        }
    }

    let spinner = ctx.output.spinner("Fetching identifiers...");
    let plan = enumerator.enumerate_all(content_types).await;
    spinner.finish_and_clear();
    plan
}

/// Keep the requested content types, in configuration order.
fn select_types(all: Vec<ContentType>, requested: &[String]) -> Result<Vec<ContentType>> {
    if requested.is_empty() {
        return Ok(all);
    }

    if let Some(unknown) = requested
        .iter()
        .find(|name| !all.iter().any(|ct| &ct.name == *name))
    {
        bail!("Unknown content type: {}", unknown);
    }

    Ok(all
        .into_iter()
        .filter(|ct| requested.contains(&ct.name))
        .collect())
}

fn print_summary(plan: &BuildPlan, ctx: &Context) {
    for entry in plan.entries() {
        let detail = if entry.mode.is_static() {
            format!("{} ({} paths)", status_badge("static"), entry.paths.len())
        } else {
            status_badge("dynamic")
        };
        ctx.output.kv(&entry.content_type, &detail);
    }

    for diagnostic in plan.diagnostics() {
        ctx.output.warn(&format!(
            "{}: {} after {}",
            diagnostic.content_type,
            diagnostic.cause,
            format_millis(diagnostic.elapsed_ms)
        ));
    }

    let dynamic = plan.dynamic_types();
    if dynamic.is_empty() {
        ctx.output
            .success(&format!("{} static paths planned", plan.total_paths()));
    } else {
        ctx.output.info(&format!(
            "{} static paths planned, rendering dynamically: {}",
            plan.total_paths(),
            dynamic.join(", ")
        ));
    }
}
