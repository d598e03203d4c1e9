use crate::backend::{BackendKind, ModelBackend, RecordBackend};
use crate::error::{StateError, StateResult};
use crate::network::Model;
use std::collections::BTreeMap;
use std::fmt;

/// Backend strategies registered ahead of time, keyed by family.
///
/// Models whose runtime type has no registered strategy are rejected with
/// `UnsupportedModelType`.
pub struct BackendRegistry {
    backends: BTreeMap<BackendKind, Box<dyn ModelBackend>>,
}

impl BackendRegistry {
    /// An empty registry. Every model is unsupported until a backend is registered.
    #[must_use]
    pub fn empty() -> Self {
        Self { backends: BTreeMap::new() }
    }

    /// Registry with the record backends for Burn and Candle.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::empty().register(Box::new(RecordBackend::burn())).register(Box::new(RecordBackend::candle()))
    }

    /// Register (or replace) the strategy for its backend family.
    #[must_use]
    pub fn register(mut self, backend: Box<dyn ModelBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Option<&dyn ModelBackend> {
        self.backends.get(&kind).map(|b| &**b)
    }

    /// Backend strategy for a model.
    pub fn resolve(&self, model: &dyn Model) -> StateResult<&dyn ModelBackend> {
        let kind = model.kind();
        BackendKind::for_model(&kind).and_then(|k| self.get(k)).ok_or_else(|| StateError::UnsupportedModelType {
            model: model.name().to_string(),
            kind: kind.to_string(),
        })
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.backends.keys().copied().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry").field("backends", &self.kinds()).finish()
    }
}
