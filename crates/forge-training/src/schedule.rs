//! Epoch-dependent selection of collaborators.
//!
//! A `Scheduled` slot is resolved to its concrete instance once per epoch
//! before use. Checkpointing always acts on the resolved instance.

use std::collections::BTreeMap;

/// A collaborator slot: either a fixed instance or an epoch-driven choice.
#[derive(Debug, Clone)]
pub enum Scheduled<T> {
    Direct(T),
    Epoch(EpochScheduler<T>),
    Repeat(RepeatScheduler<T>),
}

impl<T> Scheduled<T> {
    /// The instance active during `epoch`, if any.
    #[must_use]
    pub fn resolve(&self, epoch: u32) -> Option<&T> {
        match self {
            Self::Direct(value) => Some(value),
            Self::Epoch(scheduler) => scheduler.resolve(epoch),
            Self::Repeat(scheduler) => scheduler.resolve(epoch),
        }
    }

    pub fn resolve_mut(&mut self, epoch: u32) -> Option<&mut T> {
        match self {
            Self::Direct(value) => Some(value),
            Self::Epoch(scheduler) => scheduler.resolve_mut(epoch),
            Self::Repeat(scheduler) => scheduler.resolve_mut(epoch),
        }
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, Self::Direct(_))
    }
}

impl<T> From<T> for Scheduled<T> {
    fn from(value: T) -> Self {
        Self::Direct(value)
    }
}

impl<T> From<EpochScheduler<T>> for Scheduled<T> {
    fn from(scheduler: EpochScheduler<T>) -> Self {
        Self::Epoch(scheduler)
    }
}

impl<T> From<RepeatScheduler<T>> for Scheduled<T> {
    fn from(scheduler: RepeatScheduler<T>) -> Self {
        Self::Repeat(scheduler)
    }
}

/// Selects the value registered at the largest epoch threshold `<= epoch`.
///
/// A threshold mapped to `None` switches the slot off from that epoch on.
#[derive(Debug, Clone)]
pub struct EpochScheduler<T> {
    epochs: BTreeMap<u32, Option<T>>,
}

impl<T> Default for EpochScheduler<T> {
    fn default() -> Self {
        Self { epochs: BTreeMap::new() }
    }
}

impl<T> EpochScheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `value` starting at `epoch`.
    #[must_use]
    pub fn at(mut self, epoch: u32, value: T) -> Self {
        self.epochs.insert(epoch, Some(value));
        self
    }

    /// Deactivate the slot starting at `epoch`.
    #[must_use]
    pub fn off_at(mut self, epoch: u32) -> Self {
        self.epochs.insert(epoch, None);
        self
    }

    #[must_use]
    pub fn resolve(&self, epoch: u32) -> Option<&T> {
        self.epochs.range(..=epoch).next_back().and_then(|(_, value)| value.as_ref())
    }

    pub fn resolve_mut(&mut self, epoch: u32) -> Option<&mut T> {
        self.epochs.range_mut(..=epoch).next_back().and_then(|(_, value)| value.as_mut())
    }
}

/// Cycles through a fixed list, one entry per epoch (epoch 1 uses the first).
#[derive(Debug, Clone)]
pub struct RepeatScheduler<T> {
    cycle: Vec<Option<T>>,
}

impl<T> RepeatScheduler<T> {
    #[must_use]
    pub fn new(cycle: Vec<Option<T>>) -> Self {
        Self { cycle }
    }

    fn index(&self, epoch: u32) -> Option<usize> {
        let len = self.cycle.len();
        if len == 0 {
            return None;
        }
        // Epoch 0 wraps to the last entry.
        Some((epoch as usize + len - 1) % len)
    }

    #[must_use]
    pub fn resolve(&self, epoch: u32) -> Option<&T> {
        self.index(epoch).and_then(|i| self.cycle[i].as_ref())
    }

    pub fn resolve_mut(&mut self, epoch: u32) -> Option<&mut T> {
        self.index(epoch).and_then(|i| self.cycle[i].as_mut())
    }
}
