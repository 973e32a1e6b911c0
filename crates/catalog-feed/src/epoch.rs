//! Generation tags for results of asynchronous operations.
//!
//! Every operation captures the epoch it was issued under; the consumer
//! applies a result only while that epoch is still the live one.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Epoch = Epoch(0);

    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value paired with the epoch it was produced under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<T> {
    pub epoch: Epoch,
    pub value: T,
}

impl<T> Tagged<T> {
    pub fn new(epoch: Epoch, value: T) -> Self {
        Self { epoch, value }
    }

    pub fn is_current(&self, live: Epoch) -> bool {
        self.epoch == live
    }

    /// The value if it still belongs to `live`, otherwise `None`
    pub fn accept(self, live: Epoch) -> Option<T> {
        if self.epoch == live {
            Some(self.value)
        } else {
            None
        }
    }
}

/// Lock-free epoch counter for consumers that don't own a sequence
#[derive(Debug, Default)]
pub struct EpochCounter {
    current: AtomicU64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Epoch {
        Epoch(self.current.load(Ordering::Acquire))
    }

    /// Start a new epoch and return it
    pub fn advance(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    pub fn accept<T>(&self, tagged: Tagged<T>) -> Option<T> {
        tagged.accept(self.current())
    }
}
