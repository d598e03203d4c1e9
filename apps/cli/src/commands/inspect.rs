//! `forge inspect`: print a checkpoint's system state and summary overview.

use anyhow::{Context, Result};
use colored::Colorize;
use forge_training::{CheckpointLayout, Summary, SystemSnapshot};
use serde_json::json;
use std::path::Path;

pub fn execute(dir: &Path, json_output: bool) -> Result<()> {
    let layout = CheckpointLayout::new(dir);
    let snapshot = SystemSnapshot::read(&layout.system_path())
        .with_context(|| format!("Failed to read system state from {}", dir.display()))?;
    let summary = read_summary(&layout)?;

    if json_output {
        let summary_json = summary.as_ref().map(|s| {
            let metrics: Vec<_> = metric_rows(s)
                .into_iter()
                .map(|row| {
                    json!({
                        "mode": row.mode,
                        "key": row.key,
                        "points": row.points,
                        "latest_step": row.latest_step,
                        "latest_value": row.latest_value,
                    })
                })
                .collect();
            json!({ "name": s.name, "system_config": s.system_config, "metrics": metrics })
        });
        let out = json!({ "system": snapshot, "summary": summary_json });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Checkpoint {}", dir.display()).bold().cyan());
    println!();
    println!("  {:<24} {}", "Mode", snapshot.mode.to_string().green());
    println!("  {:<24} {}", "Global step", display_counter(snapshot.global_step));
    println!("  {:<24} {} / {}", "Epoch", snapshot.epoch_idx, snapshot.total_epochs);
    println!("  {:<24} {}", "Batch", display_counter(snapshot.batch_idx));
    println!("  {:<24} {}", "Stop requested", snapshot.stop_requested);
    println!("  {:<24} {}", "Devices", snapshot.device_count);
    if !snapshot.experiment_started_at.is_empty() {
        println!("  {:<24} {}", "Started", snapshot.experiment_started_at);
    }
    println!();

    let Some(summary) = summary else {
        println!("  {}", "No summary saved in this checkpoint.".dimmed());
        return Ok(());
    };

    let name = summary.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("(unnamed)");
    println!("{}", format!("Summary: {name}").bold());
    let rows = metric_rows(&summary);
    if rows.is_empty() {
        println!("  {}", "No metrics recorded.".dimmed());
        return Ok(());
    }

    println!("  {:<8} {:<24} {:>8} {:>12} {:>14}", "Mode", "Metric", "Points", "Latest step", "Latest value");
    println!("  {}", "─".repeat(70));
    for row in rows {
        println!(
            "  {:<8} {:<24} {:>8} {:>12} {:>14}",
            row.mode, row.key, row.points, row.latest_step, row.latest_value
        );
    }
    Ok(())
}

struct MetricRow {
    mode: String,
    key: String,
    points: usize,
    latest_step: u64,
    latest_value: f64,
}

fn metric_rows(summary: &Summary) -> Vec<MetricRow> {
    let mut rows = Vec::new();
    for (mode, metrics) in &summary.history {
        for (key, steps) in metrics {
            if let Some((step, value)) = summary.latest(*mode, key) {
                rows.push(MetricRow {
                    mode: mode.to_string(),
                    key: key.clone(),
                    points: steps.len(),
                    latest_step: step,
                    latest_value: value,
                });
            }
        }
    }
    rows
}

fn read_summary(layout: &CheckpointLayout) -> Result<Option<Summary>> {
    let path = layout.summary_path();
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let summary = serde_json::from_slice(&bytes).with_context(|| format!("Invalid summary in {}", path.display()))?;
    Ok(Some(summary))
}

fn display_counter(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
