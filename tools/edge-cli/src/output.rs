//! Output formatting for the CLI.

use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

/// Output handler for CLI messages.
///
/// Human-readable messages go to stderr so stdout stays machine-readable
/// (build plans, `--json` results).
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    fn line(&self, glyph: StyledObject<&str>, msg: &str) {
        if !self.json {
            eprintln!("{} {}", glyph, msg);
        }
    }

    pub fn info(&self, msg: &str) {
        self.line(style("ℹ").blue(), msg);
    }

    pub fn success(&self, msg: &str) {
        self.line(style("✓").green(), msg);
    }

    pub fn warn(&self, msg: &str) {
        self.line(style("⚠").yellow(), msg);
    }

    /// Errors are still reported in JSON mode, as a JSON object on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Only printed with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.line(style("→").dim(), &style(msg).dim().to_string());
        }
    }

    pub fn header(&self, title: &str) {
        if !self.json {
            eprintln!("\n{}", style(title).bold().underlined());
        }
    }

    /// Pretty JSON on stdout, in any mode.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// An indented `key: value` line.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.json {
            eprintln!("  {}: {}", style(key).dim(), value);
        }
    }

    /// Create a spinner for indeterminate progress.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Colored badge for rendering modes and routing outcomes.
pub fn status_badge(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "static" | "pass_through" | "hit" | "refreshed" => style(status).green().to_string(),
        "dynamic" | "redirect" | "stale" => style(status).yellow().to_string(),
        "unavailable" => style(status).red().to_string(),
        "bypass" => style(status).dim().to_string(),
        _ => status.to_string(),
    }
}

/// Format milliseconds as a human-readable duration.
pub fn format_millis(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}
