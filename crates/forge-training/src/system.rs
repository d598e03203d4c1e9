//! Training-progress state and checkpoint save/restore across collaborators.

use crate::config::SystemConfig;
use crate::error::{StateError, StateResult};
use crate::layout::CheckpointLayout;
use crate::mode::Mode;
use crate::network::Network;
use crate::pipeline::{Dataset, Pipeline};
use crate::registry::BackendRegistry;
use crate::schedule::Scheduled;
use crate::snapshot::SystemSnapshot;
use crate::state::{self, json_kind, Stateful, StateBlob};
use crate::summary::Summary;
use crate::trace::{record_summary, TraceContext, TraceEvent, TraceSlot};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Tracks state while an estimator runs and checkpoints it together with
/// the network, pipeline and traces it borrows.
///
/// Driven from a single orchestration thread. Only one `save_state` or
/// `load_state` call may use a given directory at a time.
pub struct System<'a> {
    network: &'a mut Network,
    pipeline: &'a mut Pipeline,
    traces: &'a mut [TraceSlot],
    registry: BackendRegistry,
    config: SystemConfig,
    mode: Mode,
    global_step: Option<u64>,
    epoch_idx: u32,
    batch_idx: Option<u64>,
    stop_requested: bool,
    experiment_started_at: String,
    summary: Summary,
}

impl<'a> System<'a> {
    pub fn new(
        network: &'a mut Network,
        pipeline: &'a mut Pipeline,
        traces: &'a mut [TraceSlot],
        config: SystemConfig,
    ) -> StateResult<Self> {
        config.validate()?;
        Ok(Self {
            network,
            pipeline,
            traces,
            registry: BackendRegistry::with_defaults(),
            config,
            mode: Mode::Warmup,
            global_step: None,
            epoch_idx: 0,
            batch_idx: None,
            stop_requested: false,
            experiment_started_at: String::new(),
            summary: Summary::new(None, None),
        })
    }

    /// Replace the backend registry used for model persistence.
    #[must_use]
    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn global_step(&self) -> Option<u64> {
        self.global_step
    }

    #[must_use]
    pub fn epoch_idx(&self) -> u32 {
        self.epoch_idx
    }

    #[must_use]
    pub fn batch_idx(&self) -> Option<u64> {
        self.batch_idx
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    #[must_use]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    #[must_use]
    pub fn experiment_started_at(&self) -> &str {
        &self.experiment_started_at
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    #[must_use]
    pub fn network(&self) -> &Network {
        &*self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut *self.network
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &*self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut *self.pipeline
    }

    #[must_use]
    pub fn traces(&self) -> &[TraceSlot] {
        &*self.traces
    }

    pub fn traces_mut(&mut self) -> &mut [TraceSlot] {
        &mut *self.traces
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn update_global_step(&mut self) {
        self.global_step = Some(self.global_step.map_or(1, |step| step + 1));
    }

    pub fn update_batch_idx(&mut self) {
        self.batch_idx = Some(self.batch_idx.map_or(1, |idx| idx + 1));
    }

    pub fn reset_batch_idx(&mut self) {
        self.batch_idx = None;
    }

    /// Enter the next epoch and clear the batch counter.
    pub fn begin_epoch(&mut self) {
        self.epoch_idx += 1;
        self.batch_idx = None;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Start a new run with a fresh summary. History is only recorded when
    /// `summary_name` is non-empty.
    pub fn reset(&mut self, summary_name: Option<&str>, system_config: Option<&str>) {
        self.experiment_started_at = timestamp();
        self.mode = Mode::Train;
        self.global_step = None;
        self.epoch_idx = 0;
        self.batch_idx = None;
        self.stop_requested = false;
        self.summary = Summary::new(summary_name.map(str::to_string), system_config.map(str::to_string));
        tracing::debug!(experiment = summary_name.unwrap_or_default(), "Reset system for training");
    }

    /// Enter a test phase, keeping train and eval history. Only the previous
    /// `test` bucket is dropped, so calling this twice is the same as once.
    pub fn reset_for_test(&mut self, summary_name: Option<&str>) {
        if self.experiment_started_at.is_empty() {
            self.experiment_started_at = timestamp();
        }
        self.mode = Mode::Test;
        if !self.stop_requested {
            self.epoch_idx = self.config.total_epochs;
        }
        self.stop_requested = false;
        if let Some(name) = summary_name.filter(|n| !n.is_empty()) {
            self.summary.name = Some(name.to_string());
        }
        self.summary.remove_mode(Mode::Test);
    }

    /// Record `value` at `history[mode][key][global_step or 0]`.
    pub fn write_summary(&mut self, key: &str, value: f64) {
        record_summary(&mut self.summary, self.mode, self.global_step, key, value);
    }

    /// Invoke every trace active in the current epoch.
    pub fn dispatch(&mut self, event: TraceEvent) -> StateResult<()> {
        let epoch = self.epoch_idx;
        let mut ctx = TraceContext {
            mode: self.mode,
            global_step: self.global_step,
            epoch_idx: epoch,
            batch_idx: self.batch_idx,
            summary: &mut self.summary,
            stop_requested: &mut self.stop_requested,
        };
        for trace in self.traces.iter_mut().filter_map(|slot| slot.resolve_mut(epoch)) {
            trace.on_event(event, &mut ctx)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            mode: self.mode,
            global_step: self.global_step,
            epoch_idx: self.epoch_idx,
            batch_idx: self.batch_idx,
            stop_requested: self.stop_requested,
            device_count: self.config.device_count,
            log_interval: self.config.log_interval,
            total_epochs: self.config.total_epochs,
            max_train_steps_per_epoch: self.config.max_train_steps_per_epoch,
            max_eval_steps_per_epoch: self.config.max_eval_steps_per_epoch,
            experiment_started_at: self.experiment_started_at.clone(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: SystemSnapshot) {
        self.mode = snapshot.mode;
        self.global_step = snapshot.global_step;
        self.epoch_idx = snapshot.epoch_idx;
        self.batch_idx = snapshot.batch_idx;
        self.stop_requested = snapshot.stop_requested;
        self.config = snapshot.config();
        self.experiment_started_at = snapshot.experiment_started_at;
    }

    /// Persist the full restorable state into `dir`, creating it if needed.
    ///
    /// Steps run in order and are not atomic: a failure leaves the files
    /// written so far on disk.
    pub fn save_state(&self, dir: impl AsRef<Path>) -> StateResult<()> {
        let layout = CheckpointLayout::new(dir.as_ref());
        layout.ensure_dir()?;

        self.snapshot().write(&layout.system_path())?;

        for model in self.network.models() {
            let backend = self.registry.resolve(&**model)?;
            backend.save(&**model, layout.root(), true)?;
        }

        write_blob(&layout.summary_path(), &self.summary)?;

        let epoch = self.epoch_idx;
        write_blob(&layout.traces_path(), &capture_slots(&*self.traces, epoch)?)?;
        write_blob(&layout.tensor_ops_path(), &capture_slots(self.network.ops(), epoch)?)?;
        write_blob(&layout.numpy_ops_path(), &capture_slots(self.pipeline.ops(), epoch)?)?;
        write_blob(&layout.datasets_path(), &capture_datasets(self.pipeline.data())?)?;

        tracing::info!(
            dir = %layout.root().display(),
            global_step = ?self.global_step,
            epoch = self.epoch_idx,
            "Saved training state"
        );
        Ok(())
    }

    /// Restore state saved by `save_state` into this system and its
    /// collaborators. The first failure aborts the remaining steps.
    pub fn load_state(&mut self, dir: impl AsRef<Path>) -> StateResult<()> {
        let layout = CheckpointLayout::new(dir.as_ref());

        let system_path = layout.system_path();
        let snapshot = SystemSnapshot::read(&system_path)?;
        snapshot.config().validate().map_err(|e| StateError::MalformedState {
            path: system_path,
            reason: e.to_string(),
        })?;
        self.apply_snapshot(snapshot);

        self.load_models(&layout)?;

        let summary_path = layout.summary_path();
        let summary: Summary = serde_json::from_value(read_blob(&summary_path)?)?;
        self.summary.restore_from(summary);

        let epoch = self.epoch_idx;
        restore_slots(&layout.traces_path(), &mut *self.traces, epoch)?;
        restore_slots(&layout.tensor_ops_path(), self.network.ops_mut(), epoch)?;
        restore_slots(&layout.numpy_ops_path(), self.pipeline.ops_mut(), epoch)?;
        restore_datasets(&layout.datasets_path(), self.pipeline.data_mut())?;

        tracing::info!(
            dir = %layout.root().display(),
            global_step = ?self.global_step,
            epoch = self.epoch_idx,
            "Loaded training state"
        );
        Ok(())
    }

    /// Check every model's artifacts before loading any of them.
    fn load_models(&mut self, layout: &CheckpointLayout) -> StateResult<()> {
        let mut weights_paths: Vec<PathBuf> = Vec::with_capacity(self.network.models().len());
        for model in self.network.models() {
            let backend = self.registry.resolve(&**model)?;
            let weights_path = layout.weights_path(model.name(), backend.weights_ext());
            if !weights_path.exists() {
                return Err(StateError::MissingWeightsFile { model: model.name().to_string(), path: weights_path });
            }
            let optimizer_path = layout.optimizer_path(model.name(), backend.optimizer_ext());
            if !optimizer_path.exists() {
                return Err(StateError::MissingOptimizerFile {
                    model: model.name().to_string(),
                    path: optimizer_path,
                });
            }
            weights_paths.push(weights_path);
        }

        for (model, weights_path) in self.network.models_mut().iter_mut().zip(&weights_paths) {
            let backend = self.registry.resolve(&**model)?;
            backend.load(&mut **model, weights_path, true)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for System<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("mode", &self.mode)
            .field("global_step", &self.global_step)
            .field("epoch_idx", &self.epoch_idx)
            .field("batch_idx", &self.batch_idx)
            .field("stop_requested", &self.stop_requested)
            .field("config", &self.config)
            .field("experiment_started_at", &self.experiment_started_at)
            .field("network", &self.network)
            .field("pipeline", &self.pipeline)
            .field("traces", &self.traces.len())
            .finish()
    }
}

fn write_blob<T: Serialize + ?Sized>(path: &Path, value: &T) -> StateResult<()> {
    std::fs::write(path, serde_json::to_vec(value)?)?;
    tracing::debug!(path = %path.display(), "Wrote state blob");
    Ok(())
}

fn read_blob(path: &Path) -> StateResult<Value> {
    if !path.exists() {
        return Err(StateError::MissingStateFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// One entry per slot, in order. Stateless or inactive slots save as `{}`.
fn capture_slots<T: Stateful + ?Sized>(slots: &[Scheduled<Box<T>>], epoch: u32) -> StateResult<Vec<StateBlob>> {
    let mut states = Vec::with_capacity(slots.len());
    for (position, slot) in slots.iter().enumerate() {
        let captured = match slot.resolve(epoch) {
            Some(obj) => state::capture(&**obj)?,
            None => {
                tracing::warn!(position, epoch, "Scheduled slot inactive at save time, storing empty state");
                None
            }
        };
        states.push(captured.unwrap_or_else(|| Value::Object(Map::new())));
    }
    Ok(states)
}

/// Datasets without persistent state are left out of the map.
fn capture_datasets(data: &BTreeMap<String, Box<dyn Dataset>>) -> StateResult<Map<String, Value>> {
    let mut states = Map::new();
    for (name, dataset) in data {
        if let Some(blob) = state::capture(&**dataset)? {
            states.insert(name.clone(), blob);
        }
    }
    Ok(states)
}

fn restore_slots<T: Stateful + ?Sized>(path: &Path, slots: &mut [Scheduled<Box<T>>], epoch: u32) -> StateResult<()> {
    let states = match read_blob(path)? {
        Value::Array(states) => states,
        other => {
            return Err(StateError::MalformedState {
                path: path.to_path_buf(),
                reason: format!("expected a list, found {}", json_kind(&other)),
            });
        }
    };
    if states.len() != slots.len() {
        return Err(StateError::StateShapeMismatch {
            path: path.to_path_buf(),
            expected: slots.len(),
            found: states.len(),
        });
    }

    for (slot, blob) in slots.iter_mut().zip(states) {
        if let Some(obj) = slot.resolve_mut(epoch) {
            state::restore(&mut **obj, blob, path)?;
        }
    }
    Ok(())
}

fn restore_datasets(path: &Path, data: &mut BTreeMap<String, Box<dyn Dataset>>) -> StateResult<()> {
    let states = match read_blob(path)? {
        Value::Object(states) => states,
        other => {
            return Err(StateError::MalformedState {
                path: path.to_path_buf(),
                reason: format!("expected a map, found {}", json_kind(&other)),
            });
        }
    };

    // A subset of the live datasets is fine, a superset is not.
    let unexpected: Vec<String> = states.keys().filter(|k| !data.contains_key(*k)).cloned().collect();
    if !unexpected.is_empty() {
        return Err(StateError::UnexpectedKey { path: path.to_path_buf(), keys: unexpected });
    }

    for (name, blob) in states {
        if let Some(dataset) = data.get_mut(&name) {
            state::restore(&mut **dataset, blob, path)?;
        }
    }
    Ok(())
}
