//! Plain-text summary of a trace log file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;

/// One call as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub time: String,
}

pub type RawLog = BTreeMap<String, Vec<RawEntry>>;

pub fn read_log(path: &str) -> Result<RawLog> {
    let text = fs::read_to_string(path).with_context(|| format!("read trace log {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parse trace log {}", path))
}

/// Render every function whose key contains `filter` (all when `None`).
pub fn render(log: &RawLog, filter: Option<&str>) -> Result<String> {
    let mut out = String::new();
    let mut shown = 0usize;
    for (key, entries) in log {
        if let Some(f) = filter {
            if !key.contains(f) {
                continue;
            }
        }
        shown += 1;
        let calls = if entries.len() == 1 { "call" } else { "calls" };
        writeln!(out, "{}  ({} {})", key, entries.len(), calls)?;
        for (i, entry) in entries.iter().enumerate() {
            writeln!(out, "  #{} @ {}", i + 1, entry.time)?;
            for (spec, value) in &entry.data {
                writeln!(out, "    {}: {}", spec, serde_json::to_string(value)?)?;
            }
        }
    }
    if shown == 0 {
        writeln!(out, "no traced functions match")?;
    }
    Ok(out)
}
