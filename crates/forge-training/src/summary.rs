use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric history: mode → metric name → step → value.
pub type History = BTreeMap<Mode, BTreeMap<String, BTreeMap<u64, f64>>>;

/// Experiment metric log.
///
/// Values are only recorded through `System::write_summary` when the summary
/// carries a non-empty name; anonymous summaries stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub name: Option<String>,
    /// Human-readable description of how the run was configured.
    pub system_config: Option<String>,
    #[serde(default, with = "history_codec")]
    pub history: History,
}

impl Summary {
    #[must_use]
    pub fn new(name: Option<String>, system_config: Option<String>) -> Self {
        Self { name, system_config, history: History::new() }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn record(&mut self, mode: Mode, key: &str, step: u64, value: f64) {
        self.history.entry(mode).or_default().entry(key.to_string()).or_default().insert(step, value);
    }

    #[must_use]
    pub fn get(&self, mode: Mode, key: &str, step: u64) -> Option<f64> {
        self.history.get(&mode)?.get(key)?.get(&step).copied()
    }

    /// Latest `(step, value)` recorded for a metric.
    #[must_use]
    pub fn latest(&self, mode: Mode, key: &str) -> Option<(u64, f64)> {
        self.history.get(&mode)?.get(key)?.iter().next_back().map(|(s, v)| (*s, *v))
    }

    /// Drop a whole mode bucket. Removing an absent bucket is a no-op.
    pub fn remove_mode(&mut self, mode: Mode) {
        self.history.remove(&mode);
    }

    /// Overwrite every field with the persisted summary's.
    pub fn restore_from(&mut self, persisted: Self) {
        self.name = persisted.name;
        self.system_config = persisted.system_config;
        self.history = persisted.history;
    }

    /// Fold another summary's history into this one. Colliding step entries
    /// take the other summary's value.
    pub fn merge(&mut self, other: &Self) {
        for (mode, metrics) in &other.history {
            let bucket = self.history.entry(*mode).or_default();
            for (key, steps) in metrics {
                bucket.entry(key.clone()).or_default().extend(steps.iter().map(|(s, v)| (*s, *v)));
            }
        }
    }
}

/// JSON has no encoding for non-finite floats, so `NaN` and the infinities
/// are stored as the strings `"NaN"`, `"inf"` and `"-inf"`.
mod history_codec {
    use super::{History, Mode};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    type Stored = BTreeMap<Mode, BTreeMap<String, BTreeMap<u64, StoredValue>>>;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum StoredValue {
        Number(f64),
        Tagged(String),
    }

    impl From<f64> for StoredValue {
        fn from(value: f64) -> Self {
            if value.is_finite() {
                Self::Number(value)
            } else if value.is_nan() {
                Self::Tagged("NaN".to_string())
            } else if value.is_sign_positive() {
                Self::Tagged("inf".to_string())
            } else {
                Self::Tagged("-inf".to_string())
            }
        }
    }

    impl StoredValue {
        fn decode(self) -> Result<f64, String> {
            match self {
                Self::Number(value) => Ok(value),
                Self::Tagged(tag) => match tag.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(format!("invalid metric value: {other:?}")),
                },
            }
        }
    }

    pub fn serialize<S: Serializer>(history: &History, serializer: S) -> Result<S::Ok, S::Error> {
        let stored: Stored = history
            .iter()
            .map(|(mode, metrics)| {
                let metrics = metrics
                    .iter()
                    .map(|(key, steps)| {
                        (key.clone(), steps.iter().map(|(step, value)| (*step, StoredValue::from(*value))).collect())
                    })
                    .collect();
                (*mode, metrics)
            })
            .collect();
        stored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<History, D::Error> {
        let mut history = History::new();
        for (mode, metrics) in Stored::deserialize(deserializer)? {
            let bucket = history.entry(mode).or_default();
            for (key, steps) in metrics {
                let mut values = BTreeMap::new();
                for (step, value) in steps {
                    values.insert(step, value.decode().map_err(D::Error::custom)?);
                }
                bucket.insert(key, values);
            }
        }
        Ok(history)
    }
}
