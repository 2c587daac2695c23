//! Colorful console output for compile and cache events.
//!
//! Provides a custom `tracing` layer that prints one line per pipeline event
//! (`cache_hit`, `build_end`, `artifact_loaded`, ...). Events are recognized
//! by their `event` field; anything else is left to other layers.

use std::io::{self, Write};
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "jitforge=info";

/// Installs the console subscriber.
///
/// Safe to call multiple times - only the first call has effect. A global
/// subscriber installed by someone else wins; this then does nothing.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(JitConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats jitforge events with colors.
pub struct JitConsoleLayer;

impl<S: Subscriber> Layer<S> for JitConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("jitforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        if let Some(line) = format_event(*metadata.level(), &visitor) {
            let _ = writeln!(io::stderr().lock(), "{line}");
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    signature: Option<String>,
    path: Option<String>,
    source: Option<String>,
    output: Option<String>,
    compiler: Option<String>,
    status: Option<String>,
    error: Option<String>,
    symbol: Option<String>,
    kind: Option<String>,
    duration_ms: Option<u64>,
    limit_secs: Option<f64>,
    after_wait: bool,
}

impl EventVisitor {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "event" => &mut self.event,
            "signature" => &mut self.signature,
            "path" => &mut self.path,
            "source" => &mut self.source,
            "output" => &mut self.output,
            "compiler" => &mut self.compiler,
            "status" => &mut self.status,
            "error" => &mut self.error,
            "symbol" => &mut self.symbol,
            "kind" => &mut self.kind,
            _ => return None,
        })
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if let Some(slot) = self.slot(field.name()) {
            *slot = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let Some(slot) = self.slot(field.name()) {
            *slot = Some(value.to_string());
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "duration_ms" {
            self.duration_ms = Some(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "limit_secs" {
            self.limit_secs = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "after_wait" {
            self.after_wait = value;
        }
    }
}

fn format_event(level: Level, v: &EventVisitor) -> Option<String> {
    let body = match v.event.as_deref()? {
        "cache_hit" => {
            let suffix = if v.after_wait { " after wait" } else { "" };
            format!("{}{} {}", "cache hit".bright_green(), suffix, short(v.signature.as_deref()))
        }
        "cache_miss" => format!("{} {}", "cache miss".yellow(), short(v.signature.as_deref())),
        "lock_wait" => format!(
            "{} {} (another builder holds the lock)",
            "waiting".bright_blue(),
            short(v.signature.as_deref())
        ),
        "build_start" => format!(
            "{} {} {}",
            "compiling".bright_white().bold(),
            v.source.as_deref().unwrap_or("?"),
            format!("with {}", v.compiler.as_deref().unwrap_or("cc")).bright_black()
        ),
        "build_end" => format!(
            "{} {} in {}",
            "compiled".bright_green().bold(),
            v.output.as_deref().unwrap_or("?"),
            format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
        ),
        "build_failed" => format!(
            "{} {}",
            "build failed".bright_red().bold(),
            v.error
                .as_deref()
                .or(v.status.as_deref())
                .unwrap_or("unknown error")
        ),
        "build_timeout" => format!(
            "{} {} after {:.0}s",
            "build timed out".bright_red().bold(),
            v.source.as_deref().unwrap_or("?"),
            v.limit_secs.unwrap_or(0.0)
        ),
        "artifact_published" => format!("{} {}", "published".bright_cyan(), short(v.signature.as_deref())),
        "artifact_loaded" => format!(
            "{} {}",
            "loaded".bright_cyan(),
            v.path.as_deref().unwrap_or("?")
        ),
        "object_created" => format!(
            "{} {} {}",
            "created".bright_cyan(),
            v.kind.as_deref().unwrap_or("object"),
            v.symbol.as_deref().unwrap_or("")
        ),
        "stale_artifact_removed" => format!(
            "{} {}",
            "removed stale artifact".yellow(),
            short(v.signature.as_deref())
        ),
        _ => return None,
    };

    Some(format!(
        "{} {} {} {}",
        timestamp().bright_black(),
        format_level(level),
        "[jit]".bright_cyan(),
        body
    ))
}

fn format_level(level: Level) -> String {
    match level {
        Level::ERROR => "ERROR".bright_red().to_string(),
        Level::WARN => " WARN".yellow().to_string(),
        Level::INFO => " INFO".bright_green().to_string(),
        Level::DEBUG => "DEBUG".bright_blue().to_string(),
        Level::TRACE => "TRACE".bright_black().to_string(),
    }
}

// Signatures are 64 hex chars; the first 12 identify them in practice.
fn short(signature: Option<&str>) -> String {
    match signature {
        Some(s) => s.get(..12).unwrap_or(s).bright_white().to_string(),
        None => String::new(),
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}
