//! Lock-free multi-producer sequencing core for Disruptor-style ring buffers.
//!
//! `ringflow` coordinates slot ownership in a bounded, power-of-two ring
//! shared by concurrent producer threads and dependent consumer threads. It
//! deliberately does not store payloads: the ring itself lives with the
//! caller, indexed by `sequence & (buffer_size - 1)`, and this crate decides
//! who may write which slot and when a slot is safe to read.
//!
//! Three problems are solved together:
//!
//! - **Claim coordination**: producers CAS a shared cursor to take exclusive,
//!   contiguous sequence ranges without overrunning the slowest consumer.
//! - **Publication visibility**: producers publish in arbitrary order; a
//!   per-slot availability table keyed by wrap count lets consumers compute
//!   the highest contiguously published sequence without locks or a shared
//!   producer-side cursor.
//! - **Consumer gating**: a [`SequenceBarrier`] blocks or spins a consumer,
//!   through a pluggable [`WaitStrategy`], until a target sequence clears
//!   both the producers and any upstream consumers.
//!
//! # Example
//!
//! ```
//! use ringflow::{
//!     BusySpinWaitStrategy, MultiProducerSequencer, Sequence, SequenceBarrier, Sequencer,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> ringflow::Result<()> {
//!     let sequencer: Arc<dyn Sequencer> = Arc::new(MultiProducerSequencer::new(
//!         8,
//!         Arc::new(BusySpinWaitStrategy::new()),
//!     )?);
//!
//!     // The consumer's progress counter gates the producers.
//!     let consumer_sequence = Arc::new(Sequence::default());
//!     sequencer.add_gating_sequences(&[Arc::clone(&consumer_sequence)]);
//!
//!     let barrier = Arc::clone(&sequencer).new_barrier(vec![]);
//!
//!     // Producer side: claim, write the payload slot, publish.
//!     let sequence = sequencer.next()?;
//!     sequencer.publish(sequence);
//!
//!     // Consumer side: wait, read up to the returned sequence, advance.
//!     let available = barrier.wait_for(sequence)?;
//!     assert_eq!(available, sequence);
//!     consumer_sequence.set(available);
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod barrier;
pub mod sequence;
pub mod sequencer;
pub mod util;
pub mod wait_strategy;


pub use availability::AvailabilityTable;
pub use barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequence::{FixedSequenceGroup, Sequence, SequenceReader};
pub use sequencer::{MultiProducerSequencer, Sequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, PhasedBackoffWaitStrategy, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};

/// The initial value of every sequence: one before the first claimable slot
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors raised by the sequencing core
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    /// Buffer sizes must be non-zero powers of two
    #[error("buffer size must be a power of 2, got: {0}")]
    BufferSize(usize),

    /// Claim batches must contain at least one sequence
    #[error("batch size must be > 0, got: {0}")]
    BatchSize(i64),

    /// A non-blocking claim would overrun the slowest consumer
    #[error("insufficient capacity to claim without overrunning consumers")]
    InsufficientCapacity,

    /// The barrier was alerted while waiting; the consumer should unwind
    #[error("sequence barrier alerted")]
    Alert,

    /// A timed wait strategy's window expired without reaching the target
    #[error("timed out waiting for sequence")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, DisruptorError>;
