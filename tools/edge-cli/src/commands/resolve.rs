//! Resolve a locale code to its region.

use anyhow::{bail, Result};
use edge_cache::ResolveError;

use super::ResolveArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the resolve command.
pub async fn run(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let resolver = ctx.resolver()?;

    let spinner = ctx.output.spinner("Fetching regions...");
    let result = resolver.resolve(&args.code).await;
    spinner.finish_and_clear();

    match result {
        Ok(resolved) => {
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({
                    "code": resolved.code,
                    "status": resolved.status,
                    "region": &*resolved.region,
                }));
                return Ok(());
            }

            ctx.output.header(&format!("Locale {}", resolved.code));
            ctx.output.kv("region", &resolved.region.id);
            ctx.output.kv("name", &resolved.region.name);
            ctx.output.kv("currency", &resolved.region.currency_code);
            ctx.output.kv("cache", &status_badge(resolved.status.as_str()));
            Ok(())
        }
        Err(ResolveError::NotFound(code)) => {
            if let Some(snapshot) = resolver.snapshot() {
                let known: Vec<String> =
                    snapshot.locales().iter().map(ToString::to_string).collect();
                ctx.output.info(&format!("Known locales: {}", known.join(", ")));
            }
            bail!("Locale {:?} is not served by any region", code)
        }
        Err(err) => Err(err.into()),
    }
}
