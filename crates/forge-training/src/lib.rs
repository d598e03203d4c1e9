//! Forge Training
//!
//! Training-state persistence for the Forge estimator:
//! - Tracking run progress (`System`: mode, step/epoch counters, stop flag)
//! - Recording experiment metrics (`Summary`)
//! - Checkpointing the system together with its network, pipeline and traces
//! - Dispatching model weight/optimizer persistence to backend strategies

pub mod backend;
pub mod config;
pub mod error;
pub mod layout;
pub mod mode;
pub mod network;
pub mod pipeline;
pub mod registry;
pub mod schedule;
pub mod snapshot;
pub mod state;
pub mod summary;
pub mod system;
pub mod trace;

pub use backend::{BackendKind, ModelBackend, RecordBackend};
pub use config::SystemConfig;
pub use error::{StateError, StateResult};
pub use layout::CheckpointLayout;
pub use mode::Mode;
pub use network::{Model, ModelKind, Network, TensorOp, TensorOpSlot};
pub use pipeline::{Dataset, NumpyOp, NumpyOpSlot, Pipeline};
pub use registry::BackendRegistry;
pub use schedule::{EpochScheduler, RepeatScheduler, Scheduled};
pub use snapshot::SystemSnapshot;
pub use state::{from_blob, to_blob, FieldBag, Persistable, StateBlob, Stateful};
pub use summary::Summary;
pub use system::System;
pub use trace::{Trace, TraceContext, TraceEvent, TraceSlot};
