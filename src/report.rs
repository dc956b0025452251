//! Human-readable reports and CSV export over a stored result document

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{CheckedChannel, ResultDocument, ResultSummary, StreamStatus};

const TABLE_WIDTH: usize = 120;
const MAX_DEAD_SAMPLES: usize = 5;
const MAX_NAME_SAMPLES: usize = 5;
const MAX_TOP_ERRORS: usize = 3;

pub const CSV_COLUMNS: [&str; 12] = [
    "name", "group", "url", "status", "error", "codec", "resolution", "framerate",
    "bitrate", "low_framerate", "mislabeled", "checked_at",
];

/// First `max` characters of `s`
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn status_display(status: StreamStatus) -> &'static str {
    match status {
        StreamStatus::Alive => "✓ Alive",
        StreamStatus::Dead => "✗ Dead",
    }
}

fn issues(ch: &CheckedChannel) -> String {
    let mut issues = Vec::new();
    if ch.low_framerate {
        issues.push("Low FPS");
    }
    if ch.mislabeled {
        issues.push("Mislabeled");
    }
    if ch.is_dead() {
        issues.push("Dead");
    }
    issues.join(",")
}

pub fn summary_line(summary: &ResultSummary) -> String {
    format!(
        "Summary: {} total | {} alive | {} dead | {} low FPS | {} mislabeled",
        summary.total, summary.alive, summary.dead, summary.low_framerate, summary.mislabeled
    )
}

/// Fixed-width results table followed by sample dead-stream errors
pub fn render_table(doc: &ResultDocument) -> String {
    let rule = "=".repeat(TABLE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!(
            "{:<35} {:<15} {:<8} {:<12} {:<8} {:<8} {:<15}",
            "Channel Name", "Group", "Status", "Resolution", "FPS", "Codec", "Issues"
        ),
        rule.clone(),
    ];

    for ch in &doc.channels {
        lines.push(format!(
            "{:<35} {:<15} {:<8} {:<12} {:<8} {:<8} {:<15}",
            truncate(&ch.name, 34),
            truncate(&ch.group, 14),
            status_display(ch.status),
            truncate(&ch.resolution, 11),
            truncate(&ch.framerate, 7),
            truncate(&ch.codec, 7),
            truncate(&issues(ch), 14),
        ));
    }

    lines.push(rule);
    lines.push(summary_line(&doc.summary));

    let dead: Vec<&CheckedChannel> = doc.channels.iter().filter(|ch| ch.is_dead()).collect();
    if !dead.is_empty() {
        lines.push(String::new());
        lines.push("Dead Stream Errors:".to_string());
        lines.push("-".repeat(80));
        for (i, ch) in dead.iter().take(MAX_DEAD_SAMPLES).enumerate() {
            let error = if ch.error.is_empty() { "Unknown error" } else { ch.error.as_str() };
            lines.push(format!("{}. {}: {}", i + 1, truncate(&ch.name, 30), truncate(error, 60)));
        }
        if dead.len() > MAX_DEAD_SAMPLES {
            lines.push(format!("... and {} more dead streams", dead.len() - MAX_DEAD_SAMPLES));
        }
    }

    lines.join("\n")
}

/// Dead-stream error reasons with counts, most frequent first.
///
/// Ties keep the order in which the reasons were first seen.
pub fn top_errors(channels: &[CheckedChannel], limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for ch in channels.iter().filter(|ch| ch.is_dead()) {
        let error = if ch.error.is_empty() { "Unknown error" } else { ch.error.as_str() };
        match counts.iter_mut().find(|(e, _)| e == error) {
            Some((_, n)) => *n += 1,
            None => counts.push((error.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

fn sample_names<'a>(channels: impl Iterator<Item = &'a CheckedChannel>) -> String {
    channels
        .take(MAX_NAME_SAMPLES)
        .map(|ch| truncate(&ch.name, 30))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Summary of the last run with top errors and sample flagged channels
pub fn render_summary(doc: &ResultDocument) -> String {
    let summary = &doc.summary;
    let mut parts = vec![
        format!("Last check results ({} channels):", summary.total),
        format!("• Alive: {}", summary.alive),
        format!("• Dead: {}", summary.dead),
        format!("• Low framerate (<30fps): {}", summary.low_framerate),
        format!("• Mislabeled resolution: {}", summary.mislabeled),
    ];

    let errors = top_errors(&doc.channels, MAX_TOP_ERRORS);
    if !errors.is_empty() {
        parts.push("\nTop errors:".to_string());
        for (error, count) in errors {
            parts.push(format!("• {}: {} channels", error, count));
        }
    }

    if doc.channels.iter().any(|ch| ch.low_framerate) {
        let names = sample_names(doc.channels.iter().filter(|ch| ch.low_framerate));
        parts.push(format!("\nLow framerate channels: {}", names));
    }

    if doc.channels.iter().any(|ch| ch.mislabeled) {
        let names = sample_names(doc.channels.iter().filter(|ch| ch.mislabeled));
        parts.push(format!("\nMislabeled channels: {}", names));
    }

    parts.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Write the CSV report for `channels`, header first
pub fn write_csv<W: Write>(out: &mut W, channels: &[CheckedChannel]) -> std::io::Result<()> {
    write!(out, "{}\r\n", CSV_COLUMNS.join(","))?;
    for ch in channels {
        let row = [
            csv_field(&ch.name),
            csv_field(&ch.group),
            csv_field(&ch.url),
            ch.status.as_str().to_string(),
            csv_field(&ch.error),
            csv_field(&ch.codec),
            csv_field(&ch.resolution),
            csv_field(&ch.framerate),
            csv_field(&ch.bitrate),
            csv_bool(ch.low_framerate).to_string(),
            csv_bool(ch.mislabeled).to_string(),
            csv_field(&ch.checked_at),
        ];
        write!(out, "{}\r\n", row.join(","))?;
    }
    Ok(())
}

/// Export the document to a timestamped CSV file under `dir`
pub fn export_csv(doc: &ResultDocument, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("iptv_check_results_{}.csv", timestamp));

    let mut out = BufWriter::new(fs::File::create(&path)?);
    write_csv(&mut out, &doc.channels)?;
    out.flush()?;

    Ok(path)
}
