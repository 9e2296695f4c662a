//! Engine configuration.
//!
//! Options arrive from an external layer as loosely-typed data and are
//! validated against a fixed schema: unknown keys and out-of-range numbers
//! are rejected with a warning and omitted from the merge, and invalid enum
//! values fall back to their documented default. Configuration problems are
//! never fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::warn;

/// Presentation animation pacing consumed by downstream overlay layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Fast,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Master switch. Turning this off pauses every registered instance.
    pub enabled: bool,
    /// Run the unnecessary-render check (expensive, opt-in).
    pub track_unnecessary_renders: bool,
    /// Allow instrumentation against a production renderer build.
    pub force_run_in_production: bool,
    /// Maintain the by-component-name report table.
    pub report: bool,
    /// Emit a debug log line per render event.
    pub log: bool,
    /// Suppress reporting for components that rendered fewer times than
    /// this within the aggregation window.
    pub render_count_threshold: u32,
    /// Aggregate decay window in ms: entries with no new events for this
    /// long are evicted.
    pub reset_count_timeout: f64,
    pub animation_speed: AnimationSpeed,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            enabled: true,
            track_unnecessary_renders: false,
            force_run_in_production: false,
            report: false,
            log: false,
            render_count_threshold: 0,
            reset_count_timeout: 5000.0,
            animation_speed: AnimationSpeed::Fast,
        }
    }
}

/// A validated partial layer of options. Fields left `None` keep their
/// previous values on merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsPatch {
    pub enabled: Option<bool>,
    pub track_unnecessary_renders: Option<bool>,
    pub force_run_in_production: Option<bool>,
    pub report: Option<bool>,
    pub log: Option<bool>,
    pub render_count_threshold: Option<u32>,
    pub reset_count_timeout: Option<f64>,
    pub animation_speed: Option<AnimationSpeed>,
}

impl OptionsPatch {
    pub fn is_empty(&self) -> bool {
        *self == OptionsPatch::default()
    }
}

impl Options {
    /// Merge a validated patch over these options.
    pub fn merged(&self, patch: &OptionsPatch) -> Options {
        Options {
            enabled: patch.enabled.unwrap_or(self.enabled),
            track_unnecessary_renders: patch
                .track_unnecessary_renders
                .unwrap_or(self.track_unnecessary_renders),
            force_run_in_production: patch
                .force_run_in_production
                .unwrap_or(self.force_run_in_production),
            report: patch.report.unwrap_or(self.report),
            log: patch.log.unwrap_or(self.log),
            render_count_threshold: patch
                .render_count_threshold
                .unwrap_or(self.render_count_threshold),
            reset_count_timeout: patch.reset_count_timeout.unwrap_or(self.reset_count_timeout),
            animation_speed: patch.animation_speed.unwrap_or(self.animation_speed),
        }
    }
}

/// Validate loosely-typed options against the schema.
///
/// Every invalid entry is dropped and described in the returned problem
/// list; the list is also emitted as one `tracing` warning. An empty input
/// yields an empty patch.
pub fn validate_options(raw: &serde_json::Map<String, Json>) -> OptionsPatch {
    let mut patch = OptionsPatch::default();
    let mut problems: Vec<String> = Vec::new();

    for (key, value) in raw {
        match key.as_str() {
            "enabled" => set_bool(&mut patch.enabled, key, value, &mut problems),
            "track_unnecessary_renders" => {
                set_bool(&mut patch.track_unnecessary_renders, key, value, &mut problems);
            }
            "force_run_in_production" => {
                set_bool(&mut patch.force_run_in_production, key, value, &mut problems);
            }
            "report" => set_bool(&mut patch.report, key, value, &mut problems),
            "log" => set_bool(&mut patch.log, key, value, &mut problems),
            "render_count_threshold" => match value.as_u64() {
                Some(n) if u32::try_from(n).is_ok() => {
                    patch.render_count_threshold = Some(n as u32);
                }
                _ => problems.push(format!("{key} must be a non-negative integer, got {value}")),
            },
            "reset_count_timeout" => match value.as_f64() {
                Some(n) if n >= 0.0 => patch.reset_count_timeout = Some(n),
                _ => problems.push(format!("{key} must be a non-negative number, got {value}")),
            },
            "animation_speed" => match value.as_str() {
                Some("slow") => patch.animation_speed = Some(AnimationSpeed::Slow),
                Some("fast") => patch.animation_speed = Some(AnimationSpeed::Fast),
                Some("off") => patch.animation_speed = Some(AnimationSpeed::Off),
                _ => {
                    problems.push(format!(
                        "invalid animation_speed {value}, using default \"fast\""
                    ));
                    patch.animation_speed = Some(AnimationSpeed::Fast);
                }
            },
            _ => problems.push(format!("unknown option \"{key}\"")),
        }
    }

    if !problems.is_empty() {
        warn!(problems = %problems.join("; "), "invalid options");
    }
    patch
}

fn set_bool(slot: &mut Option<bool>, key: &str, value: &Json, problems: &mut Vec<String>) {
    match value.as_bool() {
        Some(b) => *slot = Some(b),
        None => problems.push(format!("{key} must be a boolean, got {value}")),
    }
}
