//! Colorful console output for solver metrics.
//!
//! Provides a custom `tracing` layer that formats solver events with colors.
//!
//! ## Log Levels
//!
//! - **WARN**: Data loading and configuration warnings
//! - **INFO**: Lifecycle events (solve/phase start and end, multi-start result)
//! - **DEBUG**: Progress updates (1/sec with speed and score)
//! - **TRACE**: Individual step evaluations

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static SOLVE_START_NANOS: AtomicU64 = AtomicU64::new(0);

/// Package version for banner display.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes the solver console output.
///
/// Safe to call multiple times - only the first call has effect.
/// Prints the tutorplan banner and sets up tracing.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let filter = EnvFilter::builder()
            .with_default_directive("tutorplan_solver=info".parse().unwrap())
            .from_env_lossy()
            .add_directive("tutorplan=info".parse().unwrap());

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(SolverConsoleLayer)
            .try_init();
    });
}

// Marks the start of solving for elapsed time tracking.
fn mark_solve_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    let nanos = epoch.elapsed().as_nanos() as u64;
    SOLVE_START_NANOS.store(nanos, Ordering::Relaxed);
}

// Returns elapsed time since solve start.
fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start_nanos = SOLVE_START_NANOS.load(Ordering::Relaxed);
    let now_nanos = epoch.elapsed().as_nanos() as u64;
    (now_nanos - start_nanos) as f64 / 1_000_000_000.0
}

fn print_banner() {
    let banner = r#"
 _____      _             ____  _
|_   _|   _| |_ ___  _ __|  _ \| | __ _ _ __
  | || | | | __/ _ \| '__| |_) | |/ _` | '_ \
  | || |_| | || (_) | |  |  __/| | (_| | | | |
  |_| \__,_|\__\___/|_|  |_|   |_|\__,_|_| |_|
"#;

    let version_line = format!("              v{} - School Timetabling Solver\n", VERSION);

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats solver events with colors.
pub struct SolverConsoleLayer;

impl<S: Subscriber> Layer<S> for SolverConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // Accept events from the solver and application crates only
        if !metadata.target().starts_with("tutorplan") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let level = *metadata.level();
        let output = format_event(&visitor, level);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    message: Option<String>,
    phase: Option<String>,
    steps: Option<u64>,
    speed: Option<u64>,
    score: Option<String>,
    step: Option<u64>,
    accepted: Option<bool>,
    duration_ms: Option<u64>,
    entity_count: Option<u64>,
    value_count: Option<u64>,
    constraint_count: Option<u64>,
    time_limit_secs: Option<u64>,
    feasible: Option<bool>,
    runs: Option<u64>,
    winning_run: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        match field.name() {
            "event" => self.event = Some(s.trim_matches('"').to_string()),
            "message" => self.message = Some(s),
            "phase" => self.phase = Some(s.trim_matches('"').to_string()),
            "score" => self.score = Some(s.trim_matches('"').to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "steps" => self.steps = Some(value),
            "speed" => self.speed = Some(value),
            "step" => self.step = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "entity_count" => self.entity_count = Some(value),
            "value_count" => self.value_count = Some(value),
            "constraint_count" => self.constraint_count = Some(value),
            "time_limit_secs" => self.time_limit_secs = Some(value),
            "runs" => self.runs = Some(value),
            "winning_run" => self.winning_run = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "accepted" => self.accepted = Some(value),
            "feasible" => self.feasible = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "event" => self.event = Some(value.to_string()),
            "message" => self.message = Some(value.to_string()),
            "phase" => self.phase = Some(value.to_string()),
            "score" => self.score = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    let event = v.event.as_deref().unwrap_or("");

    match event {
        "solve_start" => format_solve_start(v),
        "solve_end" => format_solve_end(v),
        "phase_start" => format_phase_start(v),
        "phase_end" => format_phase_end(v),
        "progress" => format_progress(v),
        "step" => format_step(v, level),
        "multi_start_end" => format_multi_start_end(v),
        _ => format_plain(v, level),
    }
}

// Log lines without an event tag, such as loader warnings.
fn format_plain(v: &EventVisitor, level: Level) -> String {
    let Some(message) = v.message.as_deref() else {
        return String::new();
    };

    match level {
        Level::ERROR => format!(
            "{} {} {}",
            format_elapsed(),
            "✖".bright_red().bold(),
            message.bright_red()
        ),
        Level::WARN => format!(
            "{} {} {}",
            format_elapsed(),
            "⚠".bright_yellow().bold(),
            message.yellow()
        ),
        _ => format!("{} {}", format_elapsed(), message.white()),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn format_solve_start(v: &EventVisitor) -> String {
    mark_solve_start();
    let entities = v.entity_count.unwrap_or(0);
    let values = v.value_count.unwrap_or(0);
    let constraints = v.constraint_count.unwrap_or(0);
    let time_limit = v.time_limit_secs.unwrap_or(0);

    let mut output = format!(
        "{} {} Solving │ {} assignments │ {} values │ {} constraints │ space {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        entities.to_formatted_string(&Locale::en).bright_yellow(),
        values.to_formatted_string(&Locale::en).bright_yellow(),
        constraints.to_formatted_string(&Locale::en).bright_yellow(),
        format_search_space(entities, values).bright_magenta(),
    );

    if time_limit > 0 {
        output.push_str(&format!(
            " │ {}s limit",
            time_limit.to_formatted_string(&Locale::en).bright_yellow()
        ));
    }

    output
}

fn format_solve_end(v: &EventVisitor) -> String {
    let score = v.score.as_deref().unwrap_or("N/A");
    let is_feasible = v.feasible.unwrap_or_else(|| score.starts_with("0hard"));
    let duration = v.duration_ms.unwrap_or(0);

    let status = if is_feasible {
        "FEASIBLE".bright_green().bold().to_string()
    } else {
        "INFEASIBLE".bright_red().bold().to_string()
    };

    let mut output = format!(
        "{} {} Solving complete │ {} │ {}",
        format_elapsed(),
        "■".bright_cyan().bold(),
        format_score(score),
        status
    );

    let status_text = if is_feasible {
        "FEASIBLE SOLUTION FOUND"
    } else {
        "INFEASIBLE (hard constraints violated)"
    };
    let status_colored = if is_feasible {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };

    output.push_str("\n\n");
    output.push_str(&box_top());
    output.push_str(&box_centered(status_text, &status_colored));
    output.push_str(&box_divider());
    output.push_str(&box_row("Final Score:", score));
    if duration > 0 {
        output.push_str(&box_row("Duration:", &format_duration_ms(duration)));
    }
    output.push_str(&box_bottom());

    output
}

const BOX_INNER_WIDTH: usize = 58;

fn box_top() -> String {
    format!("{}\n", format!("╔{}╗", "═".repeat(BOX_INNER_WIDTH)).bright_cyan())
}

fn box_divider() -> String {
    format!("{}\n", format!("╠{}╣", "═".repeat(BOX_INNER_WIDTH)).bright_cyan())
}

fn box_bottom() -> String {
    format!("{}\n", format!("╚{}╝", "═".repeat(BOX_INNER_WIDTH)).bright_cyan())
}

// `plain` carries the visible width, `colored` the ANSI-wrapped text.
fn box_centered(plain: &str, colored: &str) -> String {
    let total_pad = BOX_INNER_WIDTH.saturating_sub(plain.len());
    let left_pad = total_pad / 2;
    let right_pad = total_pad - left_pad;
    format!(
        "{}{}{}{}{}\n",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    )
}

fn box_row(label: &str, value: &str) -> String {
    let width = BOX_INNER_WIDTH - 4;
    let value_width = width.saturating_sub(18);
    format!(
        "{}  {:<18}{:>value_width$}  {}\n",
        "║".bright_cyan(),
        label,
        value,
        "║".bright_cyan()
    )
}

fn format_phase_start(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");

    format!(
        "{} {} {} started",
        format_elapsed(),
        "▶".bright_blue(),
        phase.white().bold()
    )
}

fn format_phase_end(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("Unknown");
    let steps = v.steps.unwrap_or(0);
    let speed = v.speed.unwrap_or(0);
    let score = v.score.as_deref().unwrap_or("N/A");
    let duration = v.duration_ms.unwrap_or(0);

    format!(
        "{} {} {} ended │ {} │ {} steps │ {} moves/s │ {}",
        format_elapsed(),
        "◀".bright_blue(),
        phase.white().bold(),
        format_duration_ms(duration).yellow(),
        steps.to_formatted_string(&Locale::en).white(),
        speed
            .to_formatted_string(&Locale::en)
            .bright_magenta()
            .bold(),
        format_score(score)
    )
}

fn format_progress(v: &EventVisitor) -> String {
    let steps = v.steps.unwrap_or(0);
    let speed = v.speed.unwrap_or(0);
    let score = v.score.as_deref().unwrap_or("N/A");

    format!(
        "{} {} {:>10} steps │ {:>12}/s │ {}",
        format_elapsed(),
        "⚡".bright_cyan(),
        steps.to_formatted_string(&Locale::en).white(),
        speed
            .to_formatted_string(&Locale::en)
            .bright_magenta()
            .bold(),
        format_score(score)
    )
}

fn format_step(v: &EventVisitor, level: Level) -> String {
    if level != Level::TRACE {
        return String::new();
    }

    let step = v.step.unwrap_or(0);
    let score = v.score.as_deref().unwrap_or("N/A");
    let accepted = v.accepted.unwrap_or(false);

    let icon = if accepted {
        "✓".bright_green().to_string()
    } else {
        "✗".bright_red().to_string()
    };

    format!(
        "{} {} Step {:>10} │ {}",
        format_elapsed(),
        icon,
        step.to_formatted_string(&Locale::en).bright_black(),
        format_score(score).bright_black()
    )
}

fn format_multi_start_end(v: &EventVisitor) -> String {
    let runs = v.runs.unwrap_or(0);
    let winning_run = v.winning_run.unwrap_or(0);
    let score = v.score.as_deref().unwrap_or("N/A");

    format!(
        "{} {} Multi-start complete │ {} runs │ best from run {} │ {}",
        format_elapsed(),
        "◆".bright_cyan().bold(),
        runs.to_formatted_string(&Locale::en).bright_yellow(),
        winning_run.to_formatted_string(&Locale::en).bright_yellow(),
        format_score(score)
    )
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

fn format_score(score: &str) -> String {
    let Some((hard_part, soft_part)) = score.split_once('/') else {
        return score.white().to_string();
    };
    let (Some(hard), Some(soft)) = (
        hard_part.strip_suffix("hard"),
        soft_part.strip_suffix("soft"),
    ) else {
        return score.white().to_string();
    };

    let hard_str = if hard.starts_with('-') {
        format!("{}hard", hard).bright_red().to_string()
    } else {
        format!("{}hard", hard).bright_green().to_string()
    };

    let soft_str = if soft.starts_with('-') {
        format!("{}soft", soft).yellow().to_string()
    } else if soft != "0" {
        format!("{}soft", soft).bright_green().to_string()
    } else {
        format!("{}soft", soft).white().to_string()
    };

    format!("{}/{}", hard_str, soft_str)
}

// Order-of-magnitude of values^entities, the size of the raw search space.
fn format_search_space(entity_count: u64, value_count: u64) -> String {
    if entity_count == 0 || value_count == 0 {
        return "0".to_string();
    }

    let exponent = (entity_count as f64) * (value_count as f64).log10();
    format!("10^{}", exponent.floor() as i64)
}
