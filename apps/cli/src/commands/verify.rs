//! `forge verify`: check a checkpoint directory for the files a restore reads.

use anyhow::{bail, Result};
use colored::Colorize;
use forge_training::{BackendKind, CheckpointLayout, SystemSnapshot};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A model name paired with the backend family that saved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub backend: BackendKind,
}

impl FromStr for ModelSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, backend) = s.rsplit_once(':').ok_or_else(|| format!("expected NAME:BACKEND, got '{s}'"))?;
        if name.trim().is_empty() {
            return Err(format!("model name is empty in '{s}'"));
        }
        Ok(Self { name: name.trim().to_string(), backend: backend.parse()? })
    }
}

/// Every artifact `load_state` needs for the given models.
pub fn required_files(layout: &CheckpointLayout, models: &[ModelSpec]) -> Vec<PathBuf> {
    let mut files = layout.state_files();
    for model in models {
        files.push(layout.weights_path(&model.name, model.backend.weights_ext()));
        files.push(layout.optimizer_path(&model.name, model.backend.optimizer_ext()));
    }
    files
}

pub fn execute(dir: &Path, models: &[ModelSpec]) -> Result<()> {
    let layout = CheckpointLayout::new(dir);
    let mut missing = 0usize;

    println!("{}", format!("Verifying {}", dir.display()).bold().cyan());
    for path in required_files(&layout, models) {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if path.exists() {
            println!("  {} {}", "✓".green(), name);
        } else {
            println!("  {} {} {}", "✗".red(), name, "(missing)".red());
            missing += 1;
        }
    }

    // A present but unreadable system.json would fail the restore just the same.
    let system_path = layout.system_path();
    if system_path.exists() {
        if let Err(e) = SystemSnapshot::read(&system_path) {
            println!("  {} {}", "✗".red(), e.to_string().red());
            missing += 1;
        }
    }

    if missing > 0 {
        tracing::debug!(dir = %dir.display(), missing, "Checkpoint incomplete");
        bail!("checkpoint at {} is incomplete: {} problem(s) found", dir.display(), missing);
    }
    println!("{}", "Checkpoint is complete.".green());
    Ok(())
}
