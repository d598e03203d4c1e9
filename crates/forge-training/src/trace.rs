//! Trace collaborators hooked into epoch and batch boundaries.

use crate::error::StateResult;
use crate::mode::Mode;
use crate::schedule::Scheduled;
use crate::state::Stateful;
use crate::summary::Summary;

/// Lifecycle points at which traces are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    EpochBegin,
    BatchEnd,
    EpochEnd,
}

/// View of the system a trace may read and report into.
pub struct TraceContext<'s> {
    pub(crate) mode: Mode,
    pub(crate) global_step: Option<u64>,
    pub(crate) epoch_idx: u32,
    pub(crate) batch_idx: Option<u64>,
    pub(crate) summary: &'s mut Summary,
    pub(crate) stop_requested: &'s mut bool,
}

impl TraceContext<'_> {
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
        *self.stop_requested
    }

    /// Record a metric at the current step (no-op for anonymous experiments).
    pub fn write_summary(&mut self, key: &str, value: f64) {
        record_summary(self.summary, self.mode, self.global_step, key, value);
    }

    /// Ask the driving loop to stop training after the current step.
    pub fn request_stop(&mut self) {
        *self.stop_requested = true;
    }
}

pub(crate) fn record_summary(summary: &mut Summary, mode: Mode, global_step: Option<u64>, key: &str, value: f64) {
    if summary.is_active() {
        summary.record(mode, key, global_step.unwrap_or(0), value);
    }
}

/// A metric or side-effect hook. State is checkpointed through `Stateful`.
pub trait Trace: Stateful {
    fn name(&self) -> &str;

    fn on_event(&mut self, _event: TraceEvent, _ctx: &mut TraceContext<'_>) -> StateResult<()> {
        Ok(())
    }
}

pub type TraceSlot = Scheduled<Box<dyn Trace>>;
