//! Coordination barriers gating consumers on producers and on each other.
//!
//! A consumer never reads the ring directly off the cursor: in
//! multi-producer mode the cursor only records claims. The barrier combines
//! the wait strategy, the cursor, the consumer's upstream dependencies, and
//! an alert flag, and hands back the highest sequence that is both reached
//! by every dependency and contiguously published.

use crate::sequence::{FixedSequenceGroup, Sequence, SequenceReader};
use crate::sequencer::Sequencer;
use crate::wait_strategy::WaitStrategy;
use crate::{DisruptorError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Per-consumer gate over the sequencing core.
pub trait SequenceBarrier: Send + Sync + std::fmt::Debug {
    /// Wait until `sequence` is safe to read.
    ///
    /// # Returns
    /// The end of the contiguous published prefix at or beyond `sequence`,
    /// or a value below `sequence` when a timeout-capable wait strategy
    /// gave up early
    ///
    /// # Errors
    /// [`DisruptorError::Alert`] if the barrier was alerted
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// The consumer's effective view of progress: the minimum over its
    /// dependency sequences, or the claim cursor when it has none
    fn get_cursor(&self) -> i64;

    /// Whether the barrier is currently alerted
    fn is_alerted(&self) -> bool;

    /// Alert the barrier, waking and unwinding any waiting consumer
    fn alert(&self);

    /// Reset the alert flag so the barrier can be waited on again
    fn clear_alert(&self);

    /// Fail fast with [`DisruptorError::Alert`] if the barrier is alerted
    fn check_alert(&self) -> Result<()>;
}

/// Barrier implementation over a [`Sequencer`].
///
/// Tracks the sequencer's claim cursor plus an optional set of upstream
/// consumer sequences; with no upstream dependencies the cursor itself is
/// the dependency view.
#[derive(Debug)]
pub struct ProcessingSequenceBarrier {
    sequencer: Arc<dyn Sequencer>,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependent_sequence: Arc<dyn SequenceReader>,
    alerted: AtomicBool,
}

impl ProcessingSequenceBarrier {
    /// Create a barrier over `sequencer`, gated on `dependent_sequences`.
    ///
    /// An empty list means the consumer is first in line and depends only
    /// on producers.
    pub fn new(sequencer: Arc<dyn Sequencer>, dependent_sequences: Vec<Arc<Sequence>>) -> Self {
        let cursor = sequencer.get_cursor();
        let wait_strategy = sequencer.get_wait_strategy();
        let dependent_sequence: Arc<dyn SequenceReader> = if dependent_sequences.is_empty() {
            Arc::clone(&cursor) as Arc<dyn SequenceReader>
        } else {
            Arc::new(FixedSequenceGroup::new(dependent_sequences))
        };

        Self {
            sequencer,
            wait_strategy,
            cursor,
            dependent_sequence,
            alerted: AtomicBool::new(false),
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence = match self.wait_strategy.wait_for(
            sequence,
            &self.cursor,
            self.dependent_sequence.as_ref(),
            self,
        ) {
            Ok(available) => available,
            // A timed-out wait reports whatever progress exists; the
            // caller sees available < sequence and may retry.
            Err(DisruptorError::Timeout) => self.dependent_sequence.get(),
            Err(e) => return Err(e),
        };

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        // Producers publish out of claim order; trim the answer to the
        // contiguous published prefix.
        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.dependent_sequence.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        trace!("barrier alerted");
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}
