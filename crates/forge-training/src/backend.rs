//! Backend save/load strategies for model weights and optimizer state.

use crate::error::{StateError, StateResult};
use crate::network::{Model, ModelKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported tensor backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Burn,
    Candle,
}

impl BackendKind {
    /// Backend family for a model's runtime type, if one exists.
    #[must_use]
    pub fn for_model(kind: &ModelKind) -> Option<Self> {
        match kind {
            ModelKind::Burn => Some(Self::Burn),
            ModelKind::Candle => Some(Self::Candle),
            ModelKind::Other(_) => None,
        }
    }

    #[must_use]
    pub fn weights_ext(self) -> &'static str {
        match self {
            Self::Burn => "mpk",
            Self::Candle => "safetensors",
        }
    }

    #[must_use]
    pub fn optimizer_ext(self) -> &'static str {
        match self {
            Self::Burn => "mpk",
            Self::Candle => "safetensors",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Burn => f.write_str("burn"),
            Self::Candle => f.write_str("candle"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "burn" => Ok(Self::Burn),
            "candle" => Ok(Self::Candle),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Save/load strategy for one backend family.
pub trait ModelBackend {
    fn kind(&self) -> BackendKind;

    fn weights_ext(&self) -> &'static str {
        self.kind().weights_ext()
    }

    fn optimizer_ext(&self) -> &'static str {
        self.kind().optimizer_ext()
    }

    /// Write `<name>.<weights-ext>` (and `<name>_opt.<optimizer-ext>`) into `dir`.
    fn save(&self, model: &dyn Model, dir: &Path, include_optimizer: bool) -> StateResult<()>;

    /// Restore a model from its weights file; the optimizer file sits beside it.
    fn load(&self, model: &mut dyn Model, weights_path: &Path, include_optimizer: bool) -> StateResult<()>;

    /// Optimizer artifact that pairs with `weights_path`.
    fn optimizer_path_for(&self, weights_path: &Path) -> StateResult<PathBuf> {
        let stem = weights_path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            StateError::Config(format!("weights path has no file name: {}", weights_path.display()))
        })?;
        Ok(weights_path.with_file_name(format!("{stem}_opt.{}", self.optimizer_ext())))
    }
}

/// Moves engine-encoded records verbatim between the model and disk.
#[derive(Debug, Clone, Copy)]
pub struct RecordBackend {
    kind: BackendKind,
}

impl RecordBackend {
    #[must_use]
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn burn() -> Self {
        Self::new(BackendKind::Burn)
    }

    #[must_use]
    pub fn candle() -> Self {
        Self::new(BackendKind::Candle)
    }
}

impl ModelBackend for RecordBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn save(&self, model: &dyn Model, dir: &Path, include_optimizer: bool) -> StateResult<()> {
        let weights_path = dir.join(format!("{}.{}", model.name(), self.weights_ext()));
        std::fs::write(&weights_path, model.weights_record()?)?;
        tracing::debug!(model = model.name(), path = %weights_path.display(), "Saved model weights");

        if include_optimizer {
            let optimizer_path = self.optimizer_path_for(&weights_path)?;
            std::fs::write(&optimizer_path, model.optimizer_record()?)?;
            tracing::debug!(model = model.name(), path = %optimizer_path.display(), "Saved optimizer state");
        }
        Ok(())
    }

    fn load(&self, model: &mut dyn Model, weights_path: &Path, include_optimizer: bool) -> StateResult<()> {
        let weights = std::fs::read(weights_path)?;
        model.load_weights_record(&weights)?;
        tracing::debug!(model = model.name(), path = %weights_path.display(), "Loaded model weights");

        if include_optimizer {
            let optimizer_path = self.optimizer_path_for(weights_path)?;
            let optimizer = std::fs::read(&optimizer_path)?;
            model.load_optimizer_record(&optimizer)?;
            tracing::debug!(model = model.name(), path = %optimizer_path.display(), "Loaded optimizer state");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Weights {
        name: String,
        weights: Vec<u8>,
        optimizer: Vec<u8>,
    }

    impl Model for Weights {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> ModelKind {
            ModelKind::Candle
        }

        fn weights_record(&self) -> StateResult<Vec<u8>> {
            Ok(self.weights.clone())
        }

        fn optimizer_record(&self) -> StateResult<Vec<u8>> {
            Ok(self.optimizer.clone())
        }

        fn load_weights_record(&mut self, record: &[u8]) -> StateResult<()> {
            self.weights = record.to_vec();
            Ok(())
        }

        fn load_optimizer_record(&mut self, record: &[u8]) -> StateResult<()> {
            self.optimizer = record.to_vec();
            Ok(())
        }
    }

    #[test]
    fn test_backend_for_model_kind() {
        assert_eq!(BackendKind::for_model(&ModelKind::Burn), Some(BackendKind::Burn));
        assert_eq!(BackendKind::for_model(&ModelKind::Other("onnx".into())), None);
        assert_eq!("Candle".parse::<BackendKind>().unwrap(), BackendKind::Candle);
        assert!("tf".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_optimizer_path_pairs_with_weights() {
        let backend = RecordBackend::burn();
        let path = backend.optimizer_path_for(Path::new("/ckpt/encoder.mpk")).unwrap();
        assert_eq!(path, Path::new("/ckpt/encoder_opt.mpk"));
    }

    #[test]
    fn test_record_backend_roundtrip() {
        let temp = TempDir::new().unwrap();
        let backend = RecordBackend::candle();
        let saved = Weights { name: "lenet".to_string(), weights: vec![1, 2, 3], optimizer: vec![9] };
        backend.save(&saved, temp.path(), true).unwrap();

        assert!(temp.path().join("lenet.safetensors").exists());
        assert!(temp.path().join("lenet_opt.safetensors").exists());

        let mut fresh = Weights { name: "lenet".to_string(), weights: Vec::new(), optimizer: Vec::new() };
        backend.load(&mut fresh, &temp.path().join("lenet.safetensors"), true).unwrap();
        assert_eq!(fresh.weights, vec![1, 2, 3]);
        assert_eq!(fresh.optimizer, vec![9]);
    }

    #[test]
    fn test_save_without_optimizer() {
        let temp = TempDir::new().unwrap();
        let model = Weights { name: "head".to_string(), weights: vec![5], optimizer: vec![6] };
        RecordBackend::burn().save(&model, temp.path(), false).unwrap();

        assert!(temp.path().join("head.mpk").exists());
        assert!(!temp.path().join("head_opt.mpk").exists());
    }
}
