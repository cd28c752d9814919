//! Sequence counters used to track progress through the ring.
//!
//! A [`Sequence`] is the coordination primitive shared between producers and
//! consumers: the sequencer's cursor, each consumer's progress counter, and
//! the gating-sequence cache are all instances of it. The struct is padded
//! to occupy a full cache line so that neighbouring counters never share a
//! line and invalidate each other under write traffic.

use crate::util;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Cache line size for padding to prevent false sharing
const CACHE_LINE_SIZE: usize = 64;

/// A cache-line-padded atomic sequence counter.
///
/// Reads carry acquire semantics, writes carry release semantics, and
/// compare-and-set is a full read-modify-write. The initial value for all
/// sequencing roles is [`INITIAL_CURSOR_VALUE`](crate::INITIAL_CURSOR_VALUE),
/// the pre-first sentinel.
#[repr(align(64))]
pub struct Sequence {
    /// The actual sequence value
    value: AtomicI64,
    /// Padding to fill the rest of the cache line
    _padding: [u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
            _padding: [0; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
        }
    }

    /// Get the current sequence value with acquire semantics
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value with release semantics
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Atomically set the value if it currently equals `expected`
    ///
    /// # Returns
    /// True if the value was updated, false if another thread got there first
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add `increment` and return the resulting value
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(crate::INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence").field("value", &self.get()).finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Read-only view over one or more sequences.
///
/// A barrier's dependent sequence is either a single [`Sequence`] (the
/// sequencer's cursor) or a [`FixedSequenceGroup`] over upstream consumers;
/// this trait lets the wait strategies treat both uniformly.
pub trait SequenceReader: Send + Sync + std::fmt::Debug {
    /// Get the current value of the view
    fn get(&self) -> i64;
}

impl SequenceReader for Sequence {
    #[inline]
    fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

/// An immutable group of sequences read as their minimum.
///
/// The group is fixed at construction; `get` recomputes the minimum on
/// every call rather than caching it, so a consumer gated on several
/// upstream consumers always observes their true combined progress.
#[derive(Debug)]
pub struct FixedSequenceGroup {
    sequences: Vec<Arc<Sequence>>,
}

impl FixedSequenceGroup {
    /// Create a group over the given sequences
    pub fn new(sequences: Vec<Arc<Sequence>>) -> Self {
        Self { sequences }
    }
}

impl SequenceReader for FixedSequenceGroup {
    fn get(&self) -> i64 {
        util::get_minimum_sequence(&self.sequences, i64::MAX)
    }
}
