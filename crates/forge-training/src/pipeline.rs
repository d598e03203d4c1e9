//! Pipeline collaborator: named datasets plus the numpy-op sequence.

use crate::schedule::Scheduled;
use crate::state::Stateful;
use std::collections::BTreeMap;
use std::fmt;

/// A data source feeding the pipeline. Only its persistent state is
/// checkpointed, never its samples.
pub trait Dataset: Stateful {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A stage executed on raw batch data before it enters the graph.
pub trait NumpyOp: Stateful {
    fn name(&self) -> &str;
}

pub type NumpyOpSlot = Scheduled<Box<dyn NumpyOp>>;

#[derive(Default)]
pub struct Pipeline {
    data: BTreeMap<String, Box<dyn Dataset>>,
    ops: Vec<NumpyOpSlot>,
}

impl Pipeline {
    #[must_use]
    pub fn new(data: BTreeMap<String, Box<dyn Dataset>>, ops: Vec<NumpyOpSlot>) -> Self {
        Self { data, ops }
    }

    /// Register a dataset under `name`, replacing any previous one.
    #[must_use]
    pub fn with_dataset(mut self, name: impl Into<String>, dataset: Box<dyn Dataset>) -> Self {
        self.data.insert(name.into(), dataset);
        self
    }

    #[must_use]
    pub fn with_op(mut self, op: NumpyOpSlot) -> Self {
        self.ops.push(op);
        self
    }

    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, Box<dyn Dataset>> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut BTreeMap<String, Box<dyn Dataset>> {
        &mut self.data
    }

    #[must_use]
    pub fn ops(&self) -> &[NumpyOpSlot] {
        &self.ops
    }

    pub fn ops_mut(&mut self) -> &mut [NumpyOpSlot] {
        &mut self.ops
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("ops", &self.ops.len())
            .finish()
    }
}
