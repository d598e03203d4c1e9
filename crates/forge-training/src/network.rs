//! Network collaborator: model handles plus the tensor-op sequence.

use crate::error::{StateError, StateResult};
use crate::schedule::Scheduled;
use crate::state::Stateful;
use std::collections::BTreeSet;
use std::fmt;

/// Runtime type tag of a model, used for backend dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Burn,
    Candle,
    /// Any engine without a registered backend.
    Other(String),
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Burn => f.write_str("burn"),
            Self::Candle => f.write_str("candle"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// A trainable model handle owned by the tensor engine.
///
/// The engine encodes weights and optimizer state into records; the
/// checkpoint core only moves those records to and from disk.
pub trait Model {
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    fn weights_record(&self) -> StateResult<Vec<u8>>;

    fn optimizer_record(&self) -> StateResult<Vec<u8>>;

    fn load_weights_record(&mut self, record: &[u8]) -> StateResult<()>;

    fn load_optimizer_record(&mut self, record: &[u8]) -> StateResult<()>;
}

/// A stage executed inside the tensor graph.
pub trait TensorOp: Stateful {
    fn name(&self) -> &str;
}

pub type TensorOpSlot = Scheduled<Box<dyn TensorOp>>;

pub struct Network {
    models: Vec<Box<dyn Model>>,
    ops: Vec<TensorOpSlot>,
}

impl Network {
    /// Build a network. Model names must be unique and non-empty since they
    /// name the checkpoint artifacts.
    pub fn new(models: Vec<Box<dyn Model>>, ops: Vec<TensorOpSlot>) -> StateResult<Self> {
        let mut seen = BTreeSet::new();
        for model in &models {
            let name = model.name();
            if name.trim().is_empty() {
                return Err(StateError::Config("model name must not be empty".to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(StateError::Config(format!("duplicate model name: {name}")));
            }
        }
        Ok(Self { models, ops })
    }

    #[must_use]
    pub fn models(&self) -> &[Box<dyn Model>] {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut [Box<dyn Model>] {
        &mut self.models
    }

    #[must_use]
    pub fn model(&self, name: &str) -> Option<&dyn Model> {
        self.models.iter().find(|m| m.name() == name).map(|m| &**m)
    }

    #[must_use]
    pub fn ops(&self) -> &[TensorOpSlot] {
        &self.ops
    }

    pub fn ops_mut(&mut self) -> &mut [TensorOpSlot] {
        &mut self.ops
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("models", &self.models.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("ops", &self.ops.len())
            .finish()
    }
}
