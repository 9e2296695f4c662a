//! Replay a recorded render-event log through the aggregator and print a
//! ranked per-component summary.
//!
//! The log is a JSON array of `{ "key": {"x", "y"}, "at": ms, "event": … }`
//! entries, the serialized form of the engine's render events.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use renderlens_core::{Aggregator, Options, RegionKey, RenderEvent, label_text};
use renderlens_tree::Name;

#[derive(Debug, Deserialize)]
struct LogEntry {
    key: RegionKey,
    /// Timestamp in ms on the recording's own clock.
    at: f64,
    event: RenderEvent,
}

#[derive(Debug, Default, Clone)]
struct ComponentRow {
    count: u32,
    time: f64,
    unnecessary: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: renderlens <events.json> [render-count-threshold]");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    let threshold: u32 = match args.get(2) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid render-count threshold {raw:?}"))?,
        None => Options::default().render_count_threshold,
    };

    let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<LogEntry> =
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))?;

    let report = replay(&entries, threshold);
    print!("{report}");
    Ok(())
}

fn replay(entries: &[LogEntry], threshold: u32) -> String {
    let window = Options::default().reset_count_timeout;
    let mut aggregator = Aggregator::new(window);
    let mut rows: HashMap<Name, ComponentRow> = HashMap::new();

    for entry in entries {
        aggregator.observe(entry.key, entry.event.component.clone(), &entry.event, entry.at);
        let row = rows.entry(entry.event.component.clone()).or_default();
        row.count += 1;
        row.time += entry.event.time;
        if entry.event.unnecessary == Some(true) {
            row.unnecessary += 1;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} events, {} components, {} live regions\n\n",
        entries.len(),
        rows.len(),
        aggregator.len(),
    ));

    // Ranked table, hottest first.
    let mut ranked: Vec<(Name, ComponentRow)> = rows
        .into_iter()
        .filter(|(_, row)| row.count >= threshold.max(1))
        .collect();
    ranked.sort_by(|a, b| b.1.time.total_cmp(&a.1.time));

    out.push_str(&format!(
        "{:<28} {:>8} {:>10} {:>12}\n",
        "Component", "Renders", "Time", "Unnecessary"
    ));
    for (name, row) in &ranked {
        out.push_str(&format!(
            "{:<28} {:>8} {:>9.2}ms {:>12}\n",
            name.as_str(),
            row.count,
            row.time,
            row.unnecessary,
        ));
    }

    // Region labels, as an overlay would draw them.
    let mut labeled: Vec<(&RegionKey, Option<String>)> = aggregator
        .iter()
        .map(|(key, aggregate)| (key, label_text(&[aggregate])))
        .collect();
    labeled.sort_by_key(|(key, _)| (key.y, key.x));
    if !labeled.is_empty() {
        out.push('\n');
        for (key, label) in labeled {
            if let Some(label) = label {
                out.push_str(&format!("({:>5}, {:>5})  {label}\n", key.x, key.y));
            }
        }
    }

    out
}
