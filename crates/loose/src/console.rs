//! Colorful console output for run events.
//!
//! Provides a `tracing` layer that renders the engine's structured events
//! (`run_start`, `phase_end`, `retries_end`, ...) as aligned, colored lines.

use std::io::{self, Write};
use std::sync::OnceLock;

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the console layer as the global subscriber.
///
/// Safe to call multiple times; only the first call has effect. `RUST_LOG`
/// overrides the default `loose_solver=info` directive. If another global
/// subscriber is already installed this does nothing.
pub fn init() {
    INIT.get_or_init(|| {
        let mut filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy();
        for directive in ["loose_solver=info", "loose=info"] {
            if let Ok(directive) = directive.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats engine events with colors.
pub struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if !target.starts_with("loose") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    phase: Option<String>,
    mode: Option<String>,
    phase_index: Option<u64>,
    duration_ms: Option<u64>,
    steps: Option<u64>,
    speed: Option<u64>,
    rows: Option<u64>,
    fragments: Option<u64>,
    constraints: Option<u64>,
    retained: Option<u64>,
    dropped: Option<u64>,
    attempts: Option<u64>,
    succeeded: Option<bool>,
    aborted: Option<bool>,
    average_group_size: Option<f64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_str(field, s.trim_matches('"'));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "phase_index" => self.phase_index = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "steps" => self.steps = Some(value),
            "speed" => self.speed = Some(value),
            "rows" => self.rows = Some(value),
            "fragments" => self.fragments = Some(value),
            "constraints" => self.constraints = Some(value),
            "retained" => self.retained = Some(value),
            "dropped" => self.dropped = Some(value),
            "attempts" => self.attempts = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "average_group_size" {
            self.average_group_size = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "succeeded" => self.succeeded = Some(value),
            "aborted" => self.aborted = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "event" => self.event = Some(value.to_string()),
            "phase" => self.phase = Some(value.to_string()),
            "mode" => self.mode = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor) -> String {
    match v.event.as_deref().unwrap_or("") {
        "run_start" => format_run_start(v),
        "phase_start" => format_phase_start(v),
        "phase_end" => format_phase_end(v),
        "run_end" => format_run_end(v),
        "retries_end" => format_retries_end(v),
        _ => String::new(),
    }
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_run_start(v: &EventVisitor) -> String {
    format!(
        "{} {} {} rows ({}), fragments ({}), constraints ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Loose]".bright_cyan(),
        count(v.rows).bright_yellow(),
        count(v.fragments).bright_yellow(),
        count(v.constraints).bright_yellow(),
    )
}

fn format_phase_start(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");
    format!(
        "{} {} {} {} phase ({}) started",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase).bright_cyan(),
        phase.white().bold(),
        v.phase_index.unwrap_or(0).to_string().yellow()
    )
}

fn format_phase_end(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");
    format!(
        "{} {} {} {} phase ({}) ended: time spent ({}), speed ({}/sec), step total ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase).bright_cyan(),
        phase.white().bold(),
        v.phase_index.unwrap_or(0).to_string().yellow(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
        count(v.speed).bright_magenta().bold(),
        count(v.steps).white()
    )
}

fn format_run_end(v: &EventVisitor) -> String {
    let dropped = v.dropped.unwrap_or(0);
    let dropped_text = if dropped == 0 {
        count(v.dropped).bright_green().to_string()
    } else {
        count(v.dropped).bright_red().to_string()
    };
    let mut output = format!(
        "{} {} {} Run ended: retained ({}), dropped ({}), average group size ({:.2})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Loose]".bright_cyan(),
        count(v.retained).bright_yellow(),
        dropped_text,
        v.average_group_size.unwrap_or(0.0)
    );
    if v.aborted == Some(true) {
        output.push_str(&format!(" {}", "ABORTED".bright_red().bold()));
    }
    output
}

fn format_retries_end(v: &EventVisitor) -> String {
    let status = if v.succeeded == Some(true) {
        "ALL ROWS RETAINED".bright_green().bold().to_string()
    } else {
        "ROWS DROPPED".bright_red().bold().to_string()
    };
    format!(
        "{} {} {} {} after {} {} attempt(s), dropped ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Retries]".bright_cyan(),
        status,
        count(v.attempts).white(),
        v.mode.as_deref().unwrap_or("sequential"),
        count(v.dropped).white()
    )
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}
