//! The `system.json` document: primitive fields of the training state.

use crate::config::SystemConfig;
use crate::error::{StateError, StateResult};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Keys that name collaborators. These are rebuilt by the orchestrator and
/// never restored from `system.json`.
pub const COLLABORATOR_KEYS: &[&str] = &["network", "pipeline", "traces", "summary", "registry"];

/// Persisted primitive fields of a `System`.
///
/// Unknown keys are ignored on read; collaborator keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub mode: Mode,
    pub global_step: Option<u64>,
    pub epoch_idx: u32,
    pub batch_idx: Option<u64>,
    pub stop_requested: bool,
    pub device_count: u32,
    pub log_interval: Option<u64>,
    pub total_epochs: u32,
    pub max_train_steps_per_epoch: Option<u64>,
    pub max_eval_steps_per_epoch: Option<u64>,
    pub experiment_started_at: String,
}

impl SystemSnapshot {
    /// The construction config echoed into this snapshot.
    #[must_use]
    pub fn config(&self) -> SystemConfig {
        SystemConfig {
            device_count: self.device_count,
            log_interval: self.log_interval,
            total_epochs: self.total_epochs,
            max_train_steps_per_epoch: self.max_train_steps_per_epoch,
            max_eval_steps_per_epoch: self.max_eval_steps_per_epoch,
        }
    }

    pub fn write(&self, path: &Path) -> StateResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> StateResult<Self> {
        if !path.exists() {
            return Err(StateError::MissingStateFile(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let fields: Map<String, Value> = match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(fields) => fields,
            other => {
                return Err(StateError::MalformedState {
                    path: path.to_path_buf(),
                    reason: format!("expected a key-value document, found {}", crate::state::json_kind(&other)),
                });
            }
        };

        let forbidden: Vec<String> =
            fields.keys().filter(|k| COLLABORATOR_KEYS.contains(&k.as_str())).cloned().collect();
        if !forbidden.is_empty() {
            return Err(StateError::UnexpectedKey { path: path.to_path_buf(), keys: forbidden });
        }

        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}
