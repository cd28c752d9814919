//! Claim/publish coordination for concurrent producers.
//!
//! The [`MultiProducerSequencer`] hands out exclusive, contiguous sequence
//! ranges to any number of producer threads via CAS on a shared cursor,
//! gates claims against the slowest registered consumer, and records
//! publication per slot so consumers can derive a contiguous safe-to-read
//! prefix even when producers publish out of claim order.

use crate::availability::AvailabilityTable;
use crate::barrier::{ProcessingSequenceBarrier, SequenceBarrier};
use crate::sequence::Sequence;
use crate::util;
use crate::wait_strategy::WaitStrategy;
use crate::{DisruptorError, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Coordinator for claiming and publishing ring-buffer sequences.
///
/// The trait carries both the producer-facing surface (claim and publish)
/// and the consumer-facing queries a [`SequenceBarrier`](crate::SequenceBarrier)
/// needs to resolve a contiguous published prefix.
pub trait Sequencer: Send + Sync + std::fmt::Debug {
    /// The size of the ring this sequencer coordinates
    fn get_buffer_size(&self) -> usize;

    /// The cursor sequence: the highest claimed (not necessarily
    /// published) sequence
    fn get_cursor(&self) -> Arc<Sequence>;

    /// The wait strategy shared by this sequencer's barriers
    fn get_wait_strategy(&self) -> Arc<dyn WaitStrategy>;

    /// Claim the next sequence, blocking while the ring is full.
    ///
    /// # Returns
    /// The claimed sequence value
    fn next(&self) -> Result<i64>;

    /// Claim the next `n` sequences, blocking while the ring is full.
    ///
    /// # Returns
    /// The highest claimed sequence; the lowest is `highest - n + 1`
    ///
    /// # Errors
    /// [`DisruptorError::BatchSize`] if `n < 1`
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Claim the next sequence without blocking.
    ///
    /// # Errors
    /// [`DisruptorError::InsufficientCapacity`] if the claim would overrun
    /// the slowest consumer
    fn try_next(&self) -> Result<i64>;

    /// Claim the next `n` sequences without blocking.
    ///
    /// # Errors
    /// [`DisruptorError::InsufficientCapacity`] if the claim would overrun
    /// the slowest consumer; [`DisruptorError::BatchSize`] if `n < 1`
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Check whether `required_capacity` further sequences could be
    /// claimed right now. Concurrent consumer progress can make the answer
    /// conservatively false by the time the caller acts on it.
    fn has_available_capacity(&self, required_capacity: i64) -> bool;

    /// The number of slots currently claimable
    fn remaining_capacity(&self) -> i64;

    /// Force the cursor to `sequence`. Only for initialization or
    /// recovery; never concurrent with `next`/`try_next`.
    fn claim(&self, sequence: i64);

    /// Mark `sequence` published and signal blocked waiters
    fn publish(&self, sequence: i64);

    /// Mark every sequence in `[low, high]` published, then signal once
    fn publish_range(&self, low: i64, high: i64);

    /// Per-slot publication test for `sequence` in its current wrap
    fn is_available(&self, sequence: i64) -> bool;

    /// Scan `[lower_bound, available_sequence]` and return the end of the
    /// contiguous published prefix, or `lower_bound - 1` if `lower_bound`
    /// itself is unpublished
    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64;

    /// Register consumer sequences this sequencer must never overrun
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence
    ///
    /// # Returns
    /// True if the sequence was registered
    fn remove_gating_sequence(&self, sequence: Arc<Sequence>) -> bool;

    /// Minimum over the gating set, bounded by the current cursor.
    /// With no gating sequences registered this is the cursor itself.
    fn get_minimum_sequence(&self) -> i64;

    /// Create a barrier over this sequencer for a consumer gated on
    /// `sequences_to_track`; an empty list gates on producers alone
    fn new_barrier(self: Arc<Self>, sequences_to_track: Vec<Arc<Sequence>>)
        -> Arc<dyn SequenceBarrier>;
}

/// Sequencer for concurrent producer threads.
///
/// The cursor records the highest claimed sequence and advances by CAS, so
/// claim order is totally ordered while publication order is not: each
/// producer marks its own slots in the availability table and consumers use
/// [`get_highest_published_sequence`](Sequencer::get_highest_published_sequence)
/// to find how far they may read.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: parking_lot::RwLock<Vec<Arc<Sequence>>>,
    /// Last observed minimum of the gating set; may lag the true minimum
    gating_sequence_cache: Sequence,
    available: AvailabilityTable,
}

impl MultiProducerSequencer {
    /// Create a sequencer over a ring of `buffer_size` slots.
    ///
    /// # Errors
    /// [`DisruptorError::BufferSize`] if `buffer_size` is zero or not a
    /// power of two
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        if !util::is_power_of_two(buffer_size) {
            return Err(DisruptorError::BufferSize(buffer_size));
        }

        debug!(buffer_size, "creating multi-producer sequencer");

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            gating_sequences: parking_lot::RwLock::new(Vec::new()),
            gating_sequence_cache: Sequence::default(),
            available: AvailabilityTable::new(buffer_size),
        })
    }

    /// Minimum of the gating set bounded by `current`. An empty set folds
    /// to `current`, leaving the producer gated only by itself.
    fn minimum_gating_sequence(&self, current: i64) -> i64 {
        let sequences = self.gating_sequences.read();
        util::get_minimum_sequence(&sequences, current)
    }

    /// Capacity check against a cursor snapshot, refreshing the gating
    /// cache when it is stale or invalidated by a concurrent claim.
    fn has_capacity(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = (cursor_value + required_capacity) - self.buffer_size as i64;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.minimum_gating_sequence(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Sequencer for MultiProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn get_cursor(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn get_wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.wait_strategy)
    }

    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        if n < 1 {
            return Err(DisruptorError::BatchSize(n));
        }

        loop {
            let current = self.cursor.get();
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            // Two staleness signals share this branch: the claim may wrap
            // past the cached minimum, or a concurrent claim moved the
            // cursor behind our snapshot (cached > current).
            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence = self.minimum_gating_sequence(current);

                if wrap_point > gating_sequence {
                    // Ring is full. The cache is only written on the
                    // non-overrun branch below.
                    thread::park_timeout(Duration::from_nanos(1));
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        if n < 1 {
            return Err(DisruptorError::BatchSize(n));
        }

        loop {
            let current = self.cursor.get();
            let next = current + n;

            if !self.has_capacity(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity(required_capacity, self.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        // One cursor snapshot serves both sides of the subtraction.
        let produced = self.cursor.get();
        let consumed = self.minimum_gating_sequence(produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set(sequence);
    }

    fn publish(&self, sequence: i64) {
        self.available.set_available(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, low: i64, high: i64) {
        let mut sequence = low;
        while sequence <= high {
            self.available.set_available(sequence);
            sequence += 1;
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, sequence: i64) -> bool {
        self.available.is_available(sequence)
    }

    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64 {
        self.available
            .highest_published_sequence(lower_bound, available_sequence)
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        let mut sequences = self.gating_sequences.write();
        sequences.extend_from_slice(gating_sequences);
        debug!(total = sequences.len(), "registered gating sequences");
    }

    fn remove_gating_sequence(&self, sequence: Arc<Sequence>) -> bool {
        let mut sequences = self.gating_sequences.write();
        if let Some(pos) = sequences.iter().position(|s| Arc::ptr_eq(s, &sequence)) {
            sequences.remove(pos);
            true
        } else {
            false
        }
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.minimum_gating_sequence(self.cursor.get())
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(self, sequences_to_track))
    }
}
