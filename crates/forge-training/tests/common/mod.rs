//! Shared collaborator fixtures for persistence tests.

#![allow(dead_code)]

use forge_training::{
    from_blob, to_blob, Dataset, FieldBag, Model, ModelKind, Network, NumpyOp, NumpyOpSlot, Persistable,
    Pipeline, Scheduled, StateBlob, StateResult, Stateful, TensorOp, TensorOpSlot, Trace, TraceContext,
    TraceEvent, TraceSlot,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

/// Model whose engine records are plain byte vectors.
pub struct FakeModel {
    name: String,
    kind: ModelKind,
    weights: Vec<u8>,
    optimizer: Vec<u8>,
}

impl FakeModel {
    pub fn boxed(name: &str, kind: ModelKind, weights: &[u8], optimizer: &[u8]) -> Box<dyn Model> {
        Box::new(Self { name: name.to_string(), kind, weights: weights.to_vec(), optimizer: optimizer.to_vec() })
    }
}

impl Model for FakeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        self.kind.clone()
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

#[derive(Serialize, Deserialize)]
struct CounterState {
    seen: u64,
}

/// Counts batches; persisted through an explicit `Persistable` impl.
pub struct CountingTrace {
    name: String,
    seen: Rc<Cell<u64>>,
}

impl CountingTrace {
    pub fn new(name: &str, seen: u64) -> (Self, Rc<Cell<u64>>) {
        let handle = Rc::new(Cell::new(seen));
        (Self { name: name.to_string(), seen: Rc::clone(&handle) }, handle)
    }
}

impl Persistable for CountingTrace {
    fn extract_state(&self) -> StateResult<StateBlob> {
        to_blob(&CounterState { seen: self.seen.get() })
    }

    fn apply_state(&mut self, state: StateBlob) -> StateResult<()> {
        let state: CounterState = from_blob(state)?;
        self.seen.set(state.seen);
        Ok(())
    }
}

impl Stateful for CountingTrace {
    fn persistable(&self) -> Option<&dyn Persistable> {
        Some(self)
    }

    fn persistable_mut(&mut self) -> Option<&mut dyn Persistable> {
        Some(self)
    }
}

impl Trace for CountingTrace {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&mut self, event: TraceEvent, ctx: &mut TraceContext<'_>) -> StateResult<()> {
        match event {
            TraceEvent::BatchEnd => self.seen.set(self.seen.get() + 1),
            TraceEvent::EpochEnd => ctx.write_summary(&self.name, self.seen.get() as f64),
            TraceEvent::EpochBegin => {}
        }
        Ok(())
    }
}

/// Requests a stop once `patience` epochs have elapsed; field-bag state.
pub struct EarlyStopTrace {
    fields: FieldBag,
}

impl EarlyStopTrace {
    pub fn new(patience: u64) -> Self {
        let mut fields = FieldBag::new();
        fields.insert("patience".to_string(), json!(patience));
        fields.insert("wait".to_string(), json!(0));
        Self { fields }
    }
}

impl Stateful for EarlyStopTrace {
    fn fields(&self) -> Option<&FieldBag> {
        Some(&self.fields)
    }

    fn fields_mut(&mut self) -> Option<&mut FieldBag> {
        Some(&mut self.fields)
    }
}

impl Trace for EarlyStopTrace {
    fn name(&self) -> &str {
        "early_stop"
    }

    fn on_event(&mut self, event: TraceEvent, ctx: &mut TraceContext<'_>) -> StateResult<()> {
        if event == TraceEvent::EpochEnd {
            let wait = self.fields["wait"].as_u64().unwrap_or(0) + 1;
            self.fields.insert("wait".to_string(), json!(wait));
            if wait >= self.fields["patience"].as_u64().unwrap_or(u64::MAX) {
                ctx.request_stop();
            }
        }
        Ok(())
    }
}

/// Tensor-op or numpy-op with no persistent state.
pub struct StatelessOp(pub &'static str);

impl Stateful for StatelessOp {}

impl TensorOp for StatelessOp {
    fn name(&self) -> &str {
        self.0
    }
}

impl NumpyOp for StatelessOp {
    fn name(&self) -> &str {
        self.0
    }
}

/// Op carrying a field-bag (e.g. a running normalization statistic).
pub struct StatOp {
    name: &'static str,
    fields: FieldBag,
}

impl StatOp {
    pub fn new(name: &'static str, mean: f64) -> Self {
        let mut fields = FieldBag::new();
        fields.insert("mean".to_string(), json!(mean));
        Self { name, fields }
    }
}

impl Stateful for StatOp {
    fn fields(&self) -> Option<&FieldBag> {
        Some(&self.fields)
    }

    fn fields_mut(&mut self) -> Option<&mut FieldBag> {
        Some(&mut self.fields)
    }
}

impl TensorOp for StatOp {
    fn name(&self) -> &str {
        self.name
    }
}

impl NumpyOp for StatOp {
    fn name(&self) -> &str {
        self.name
    }
}

/// Dataset whose shuffle seed is persisted.
pub struct ShuffledDataset {
    len: usize,
    seed: Rc<Cell<u64>>,
}

impl ShuffledDataset {
    pub fn new(len: usize, seed: u64) -> (Self, Rc<Cell<u64>>) {
        let handle = Rc::new(Cell::new(seed));
        (Self { len, seed: Rc::clone(&handle) }, handle)
    }
}

impl Persistable for ShuffledDataset {
    fn extract_state(&self) -> StateResult<StateBlob> {
        Ok(json!({ "seed": self.seed.get() }))
    }

    fn apply_state(&mut self, state: StateBlob) -> StateResult<()> {
        if let Some(seed) = state.get("seed").and_then(serde_json::Value::as_u64) {
            self.seed.set(seed);
        }
        Ok(())
    }
}

impl Stateful for ShuffledDataset {
    fn persistable(&self) -> Option<&dyn Persistable> {
        Some(self)
    }

    fn persistable_mut(&mut self) -> Option<&mut dyn Persistable> {
        Some(self)
    }
}

impl Dataset for ShuffledDataset {
    fn len(&self) -> usize {
        self.len
    }
}

/// Dataset with no persistent state.
pub struct StaticDataset(pub usize);

impl Stateful for StaticDataset {}

impl Dataset for StaticDataset {
    fn len(&self) -> usize {
        self.0
    }
}

/// Live collaborators plus handles into their state.
pub struct Fixture {
    pub network: Network,
    pub pipeline: Pipeline,
    pub traces: Vec<TraceSlot>,
    pub trace_seen: Rc<Cell<u64>>,
    pub train_seed: Rc<Cell<u64>>,
}

/// Two models (one per backend), a tensor-op pair, a numpy-op pair, two
/// traces and two datasets. `variant` seeds every value so fixtures built
/// with different variants hold different state.
pub fn fixture(variant: u8) -> Fixture {
    let v = f64::from(variant);
    let network = Network::new(
        vec![
            FakeModel::boxed("encoder", ModelKind::Burn, &[variant, 1], &[variant, 2]),
            FakeModel::boxed("head", ModelKind::Candle, &[variant, 3], &[variant, 4]),
        ],
        vec![tensor_op(StatOp::new("norm", v)), tensor_op(StatelessOp("relu"))],
    )
    .expect("valid network");

    let (train, train_seed) = ShuffledDataset::new(100, u64::from(variant) * 10);
    let pipeline = Pipeline::default()
        .with_dataset("train", Box::new(train))
        .with_dataset("eval", Box::new(StaticDataset(20)))
        .with_op(numpy_op(StatelessOp("tokenize")))
        .with_op(numpy_op(StatOp::new("pad", v * 2.0)));

    let (counter, trace_seen) = CountingTrace::new("batches", u64::from(variant));
    let traces: Vec<TraceSlot> = vec![trace(counter), trace(EarlyStopTrace::new(3))];

    Fixture { network, pipeline, traces, trace_seen, train_seed }
}

pub fn trace<T: Trace + 'static>(t: T) -> TraceSlot {
    Scheduled::Direct(Box::new(t))
}

pub fn tensor_op<T: TensorOp + 'static>(op: T) -> TensorOpSlot {
    Scheduled::Direct(Box::new(op))
}

pub fn numpy_op<T: NumpyOp + 'static>(op: T) -> NumpyOpSlot {
    Scheduled::Direct(Box::new(op))
}
