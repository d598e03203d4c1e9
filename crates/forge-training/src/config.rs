//! Construction-time configuration echoed into the system state.

use crate::error::{StateError, StateResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration values a `System` is constructed with.
///
/// These are echoed into `system.json` for reproducibility; only the driving
/// loop's counters change mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// How many accelerator devices are available for training.
    #[serde(default = "default_device_count")]
    pub device_count: u32,

    /// Log every n steps (0 disables train logging, `None` disables all logging).
    #[serde(default)]
    pub log_interval: Option<u64>,

    /// How many epochs training is expected to run for.
    #[serde(default)]
    pub total_epochs: u32,

    /// Cut training epochs short after this many steps.
    #[serde(default)]
    pub max_train_steps_per_epoch: Option<u64>,

    /// Cut evaluation epochs short after this many steps.
    #[serde(default)]
    pub max_eval_steps_per_epoch: Option<u64>,
}

fn default_device_count() -> u32 {
    1
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_count: default_device_count(),
            log_interval: None,
            total_epochs: 0,
            max_train_steps_per_epoch: None,
            max_eval_steps_per_epoch: None,
        }
    }
}

impl SystemConfig {
    #[must_use]
    pub fn new(total_epochs: u32) -> Self {
        Self { total_epochs, ..Self::default() }
    }

    #[must_use]
    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    #[must_use]
    pub fn with_log_interval(mut self, log_interval: Option<u64>) -> Self {
        self.log_interval = log_interval;
        self
    }

    #[must_use]
    pub fn with_max_train_steps(mut self, steps: Option<u64>) -> Self {
        self.max_train_steps_per_epoch = steps;
        self
    }

    #[must_use]
    pub fn with_max_eval_steps(mut self, steps: Option<u64>) -> Self {
        self.max_eval_steps_per_epoch = steps;
        self
    }

    pub fn validate(&self) -> StateResult<()> {
        if self.device_count == 0 {
            return Err(StateError::Config("device_count must be >= 1".to_string()));
        }
        if self.max_train_steps_per_epoch == Some(0) {
            return Err(StateError::Config("max_train_steps_per_epoch must be >= 1".to_string()));
        }
        if self.max_eval_steps_per_epoch == Some(0) {
            return Err(StateError::Config("max_eval_steps_per_epoch must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> StateResult<Self> {
        if !path.exists() {
            return Err(StateError::Config(format!("configuration file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> StateResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
