//! Per-object state capability for traces, ops and datasets.
//!
//! An object is saved and restored through the first capability it exposes:
//! - an explicit `Persistable` implementation,
//! - a generic field-bag whose persisted keys are merged in,
//! - nothing, in which case it is treated as stateless and skipped.

use crate::error::{StateError, StateResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Opaque persisted state of one object.
pub type StateBlob = Value;

/// Generic named-field state.
pub type FieldBag = Map<String, Value>;

/// Explicit state extract/apply pair.
pub trait Persistable {
    fn extract_state(&self) -> StateResult<StateBlob>;

    fn apply_state(&mut self, state: StateBlob) -> StateResult<()>;
}

/// Capability probe implemented by every collaborator whose state may be
/// checkpointed. The defaults declare the object stateless.
pub trait Stateful {
    fn persistable(&self) -> Option<&dyn Persistable> {
        None
    }

    fn persistable_mut(&mut self) -> Option<&mut dyn Persistable> {
        None
    }

    fn fields(&self) -> Option<&FieldBag> {
        None
    }

    fn fields_mut(&mut self) -> Option<&mut FieldBag> {
        None
    }
}

/// Serialize a typed state value into a blob.
pub fn to_blob<T: Serialize>(value: &T) -> StateResult<StateBlob> {
    Ok(serde_json::to_value(value)?)
}

/// Deserialize a blob into a typed state value.
pub fn from_blob<T: DeserializeOwned>(blob: StateBlob) -> StateResult<T> {
    Ok(serde_json::from_value(blob)?)
}

/// Capture an object's state; `None` when it is stateless.
pub(crate) fn capture<S: Stateful + ?Sized>(obj: &S) -> StateResult<Option<StateBlob>> {
    if let Some(explicit) = obj.persistable() {
        return explicit.extract_state().map(Some);
    }
    Ok(obj.fields().map(|bag| Value::Object(bag.clone())))
}

/// Apply a persisted blob to a live object.
pub(crate) fn restore<S: Stateful + ?Sized>(obj: &mut S, state: StateBlob, source: &Path) -> StateResult<()> {
    if let Some(explicit) = obj.persistable_mut() {
        return explicit.apply_state(state);
    }
    if let Some(bag) = obj.fields_mut() {
        return match state {
            Value::Object(persisted) => {
                bag.extend(persisted);
                Ok(())
            }
            other => Err(StateError::MalformedState {
                path: source.to_path_buf(),
                reason: format!("expected a field map, found {}", json_kind(&other)),
            }),
        };
    }
    Ok(())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
