//! Show the routing decision for a path.

use anyhow::Result;
use edge_core::{GeoInfo, RequestContext};
use edge_router::RouteDecision;

use super::RouteArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the route command.
pub async fn run(args: RouteArgs, ctx: &Context) -> Result<()> {
    let router = ctx.router();

    let mut request = RequestContext::new(&args.path);
    if let Some(country) = args.country {
        request = request.with_geo(GeoInfo {
            country: Some(country),
        });
    }

    let decision = router.route(&request).await;
    let response = decision.to_response();

    if ctx.output.is_json() {
        let forward: serde_json::Map<String, serde_json::Value> = decision
            .forward_headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.to_string(), serde_json::Value::from(value)))
            })
            .collect();

        ctx.output.json(&serde_json::json!({
            "path": request.path,
            "decision": decision.kind(),
            "status": response.as_ref().map(|r| r.status().as_u16()),
            "location": location(&decision),
            "reason": reason(&decision),
            "forward_headers": forward,
        }));
        return Ok(());
    }

    ctx.output.header(&format!("Route {}", args.path));
    ctx.output.kv("decision", &status_badge(decision.kind()));

    match &decision {
        RouteDecision::PassThrough { locale, region } => {
            ctx.output.kv("locale", locale.as_str());
            ctx.output.kv("region", &region.id);
        }
        RouteDecision::Redirect { location, status } => {
            ctx.output.kv("status", status.as_str());
            ctx.output.kv("location", location);
        }
        RouteDecision::Bypass => {}
        RouteDecision::Unavailable { reason, detail } => {
            ctx.output.kv("status", "503");
            ctx.output.kv("reason", reason.as_str());
            ctx.output.kv("detail", detail);
        }
    }

    Ok(())
}

fn location(decision: &RouteDecision) -> Option<&str> {
    match decision {
        RouteDecision::Redirect { location, .. } => Some(location),
        _ => None,
    }
}

fn reason(decision: &RouteDecision) -> Option<&'static str> {
    match decision {
        RouteDecision::Unavailable { reason, .. } => Some(reason.as_str()),
        _ => None,
    }
}
