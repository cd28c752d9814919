//! Wait strategies for consumers awaiting a target sequence.
//!
//! A wait strategy decides how a consumer burns time between "the sequence
//! I want" and "the sequence that exists": block on a condvar, sleep,
//! yield, or spin. Every strategy must observe the barrier's alert flag so
//! a shutdown can unwind a parked consumer.

use crate::barrier::SequenceBarrier;
use crate::sequence::{Sequence, SequenceReader};
use crate::{DisruptorError, Result};
use parking_lot::{Condvar, Mutex};
use std::hint;
use std::thread;
use std::time::{Duration, Instant};

/// Strategy for waiting until a target sequence becomes available.
///
/// `wait_for` returns once the dependent view reaches `sequence`, fails
/// with [`DisruptorError::Alert`] when the barrier is alerted, and for
/// timeout-capable strategies fails with [`DisruptorError::Timeout`] when
/// the window expires. The returned value is the latest observed dependent
/// value, which may exceed `sequence`.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for `sequence` to become available.
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The sequencer's claim cursor
    /// * `dependent` - The consumer's effective dependency view
    /// * `barrier` - The barrier driving this wait, for alert checks
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake any threads blocked inside `wait_for`.
    ///
    /// Called once per publish and on alert. No-op for strategies that
    /// never block.
    fn signal_all_when_blocking(&self);
}

/// Blocking wait strategy using a mutex and condition variable.
///
/// Lowest CPU use and highest latency of the built-in strategies; the
/// producer-side signal is required for wakeup. The condvar wait is bounded
/// so a signal racing ahead of the sleep cannot strand the waiter.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.condvar.wait_for(&mut guard, Duration::from_millis(1));
            }
        }

        // The cursor has advanced far enough; now spin until upstream
        // consumers (if any) catch up as well.
        let mut available_sequence;
        while {
            available_sequence = dependent.get();
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        self.condvar.notify_all();
    }
}

/// Sleeping wait strategy: spin, then yield, then park in 1 ns increments.
///
/// Low CPU use with moderate latency; the short park keeps the consumer
/// responsive when producers are about to advance.
#[derive(Debug)]
pub struct SleepingWaitStrategy {
    retries: i32,
    sleep_duration: Duration,
}

impl SleepingWaitStrategy {
    const DEFAULT_RETRIES: i32 = 200;

    /// Create a sleeping wait strategy with the default retry ladder
    pub fn new() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            sleep_duration: Duration::from_nanos(1),
        }
    }

    /// Create a sleeping wait strategy with a custom park duration
    pub fn new_with_duration(sleep_duration: Duration) -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            sleep_duration,
        }
    }

    fn apply_wait_method(&self, barrier: &dyn SequenceBarrier, counter: i32) -> Result<i32> {
        barrier.check_alert()?;

        if counter > 100 {
            Ok(counter - 1)
        } else if counter > 0 {
            thread::yield_now();
            Ok(counter - 1)
        } else {
            thread::park_timeout(self.sleep_duration);
            Ok(counter)
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.retries;

        let mut available_sequence;
        while {
            available_sequence = dependent.get();
            available_sequence < sequence
        } {
            counter = self.apply_wait_method(barrier, counter)?;
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        // Parked waiters time out on their own.
    }
}

/// Yielding wait strategy: a short spin burst, then cooperative yields.
///
/// Low latency when the number of busy threads stays at or below the core
/// count.
#[derive(Debug, Default)]
pub struct YieldingWaitStrategy;

impl YieldingWaitStrategy {
    const SPIN_TRIES: u32 = 100;

    /// Create a new yielding wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = Self::SPIN_TRIES;

        let mut available_sequence;
        while {
            available_sequence = dependent.get();
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                hint::spin_loop();
            }
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        // Never blocks.
    }
}

/// Busy-spin wait strategy: pure spinning, never yields the CPU.
///
/// Lowest latency, full CPU burn. Only appropriate when the consumer can
/// own a core outright.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut available_sequence;
        while {
            available_sequence = dependent.get();
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        // Never blocks.
    }
}

/// Phased backoff: spin, then yield, then hand off to a fallback strategy.
///
/// Spins for bursts of [`Self::SPIN_TRIES`] iterations; once `spin_timeout`
/// has elapsed it starts yielding, and once `yield_timeout` has elapsed it
/// delegates the remainder of the wait to the fallback strategy. The
/// timeouts tune the latency/CPU tradeoff for mixed workloads.
#[derive(Debug)]
pub struct PhasedBackoffWaitStrategy {
    spin_timeout: Duration,
    yield_timeout: Duration,
    fallback: Box<dyn WaitStrategy>,
}

impl PhasedBackoffWaitStrategy {
    const SPIN_TRIES: u32 = 10_000;

    /// Create a phased backoff strategy over an arbitrary fallback
    pub fn new(
        spin_timeout: Duration,
        yield_timeout: Duration,
        fallback: Box<dyn WaitStrategy>,
    ) -> Self {
        Self {
            spin_timeout,
            yield_timeout,
            fallback,
        }
    }

    /// Phased backoff ending in a condvar block
    pub fn with_lock(spin_timeout: Duration, yield_timeout: Duration) -> Self {
        Self::new(
            spin_timeout,
            yield_timeout,
            Box::new(BlockingWaitStrategy::new()),
        )
    }

    /// Phased backoff ending in 1 ns parks
    pub fn with_sleep(spin_timeout: Duration, yield_timeout: Duration) -> Self {
        Self::new(
            spin_timeout,
            yield_timeout,
            Box::new(SleepingWaitStrategy::new()),
        )
    }
}

impl WaitStrategy for PhasedBackoffWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut start_time: Option<Instant> = None;
        let mut counter = Self::SPIN_TRIES;

        loop {
            let available_sequence = dependent.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }

            counter -= 1;
            if counter == 0 {
                barrier.check_alert()?;

                match start_time {
                    None => start_time = Some(Instant::now()),
                    Some(started) => {
                        let elapsed = started.elapsed();
                        if elapsed > self.yield_timeout {
                            return self.fallback.wait_for(sequence, cursor, dependent, barrier);
                        }
                        if elapsed > self.spin_timeout {
                            thread::yield_now();
                        }
                    }
                }
                counter = Self::SPIN_TRIES;
            } else {
                hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        self.fallback.signal_all_when_blocking();
    }
}

/// Blocking wait with a deadline.
///
/// Behaves like [`BlockingWaitStrategy`] until `timeout` elapses, then
/// fails with [`DisruptorError::Timeout`]. The barrier converts that into
/// the advisory early return (`available < sequence`) so the consumer can
/// retry with the same target.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    /// Create a timeout-blocking strategy with the given window
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceReader,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let deadline = Instant::now() + self.timeout;

        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                let now = Instant::now();
                if now >= deadline {
                    return Err(DisruptorError::Timeout);
                }
                let wait = (deadline - now).min(Duration::from_millis(1));
                self.condvar.wait_for(&mut guard, wait);
            }
        }

        let mut available_sequence;
        while {
            available_sequence = dependent.get();
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            if Instant::now() >= deadline {
                return Err(DisruptorError::Timeout);
            }
            hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Barrier stub carrying only the alert flag; wait strategies never
    /// call back into `wait_for`.
    #[derive(Debug, Default)]
    struct StubBarrier {
        alerted: AtomicBool,
    }

    impl SequenceBarrier for StubBarrier {
        fn wait_for(&self, _sequence: i64) -> Result<i64> {
            unreachable!("strategies do not re-enter the barrier")
        }

        fn get_cursor(&self) -> i64 {
            crate::INITIAL_CURSOR_VALUE
        }

        fn is_alerted(&self) -> bool {
            self.alerted.load(Ordering::Acquire)
        }

        fn alert(&self) {
            self.alerted.store(true, Ordering::Release);
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

    fn assert_immediate_return(strategy: &dyn WaitStrategy) {
        let cursor = Arc::new(Sequence::new(10));
        let barrier = StubBarrier::default();

        let result = strategy.wait_for(5, &cursor, cursor.as_ref(), &barrier);
        assert_eq!(result.unwrap(), 10);
    }

    #[test]
    fn test_strategies_return_available_sequence_immediately() {
        assert_immediate_return(&BlockingWaitStrategy::new());
        assert_immediate_return(&SleepingWaitStrategy::new());
        assert_immediate_return(&YieldingWaitStrategy::new());
        assert_immediate_return(&BusySpinWaitStrategy::new());
        assert_immediate_return(&PhasedBackoffWaitStrategy::with_lock(
            Duration::from_micros(1),
            Duration::from_micros(10),
        ));
        assert_immediate_return(&TimeoutBlockingWaitStrategy::new(Duration::from_millis(10)));
    }

    #[test]
    fn test_blocking_wakes_on_signal() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let cursor = Arc::new(Sequence::default());

        let producer = {
            let strategy = Arc::clone(&strategy);
            let cursor = Arc::clone(&cursor);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                cursor.set(3);
                strategy.signal_all_when_blocking();
            })
        };

        let barrier = StubBarrier::default();
        let available = strategy.wait_for(0, &cursor, cursor.as_ref(), &barrier).unwrap();
        assert!(available >= 0);
        producer.join().unwrap();
    }

    #[test]
    fn test_blocking_surfaces_alert() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let cursor = Arc::new(Sequence::default());
        let barrier = Arc::new(StubBarrier::default());

        let alerter = {
            let strategy = Arc::clone(&strategy);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                barrier.alert();
                strategy.signal_all_when_blocking();
            })
        };

        let result = strategy.wait_for(5, &cursor, cursor.as_ref(), barrier.as_ref());
        assert!(matches!(result, Err(DisruptorError::Alert)));
        alerter.join().unwrap();
    }

    #[test]
    fn test_sleeping_observes_progress() {
        let strategy = SleepingWaitStrategy::new();
        let cursor = Arc::new(Sequence::default());

        let producer = {
            let cursor = Arc::clone(&cursor);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(5));
                cursor.set(1);
            })
        };

        let barrier = StubBarrier::default();
        let available = strategy.wait_for(1, &cursor, cursor.as_ref(), &barrier).unwrap();
        assert!(available >= 1);
        producer.join().unwrap();
    }

    #[test]
    fn test_yielding_surfaces_alert() {
        let strategy = YieldingWaitStrategy::new();
        let cursor = Arc::new(Sequence::default());
        let barrier = StubBarrier::default();
        barrier.alert();

        let result = strategy.wait_for(5, &cursor, cursor.as_ref(), &barrier);
        assert!(matches!(result, Err(DisruptorError::Alert)));
    }

    #[test]
    fn test_busy_spin_surfaces_alert() {
        let strategy = BusySpinWaitStrategy::new();
        let cursor = Arc::new(Sequence::default());
        let barrier = StubBarrier::default();
        barrier.alert();

        let result = strategy.wait_for(5, &cursor, cursor.as_ref(), &barrier);
        assert!(matches!(result, Err(DisruptorError::Alert)));
    }

    #[test]
    fn test_phased_backoff_reaches_fallback() {
        // Aggressive timeouts so the test passes through spin and yield
        // phases quickly, ending in the sleeping fallback.
        let strategy = PhasedBackoffWaitStrategy::with_sleep(
            Duration::from_micros(1),
            Duration::from_micros(2),
        );
        let cursor = Arc::new(Sequence::default());

        let producer = {
            let cursor = Arc::clone(&cursor);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                cursor.set(0);
            })
        };

        let barrier = StubBarrier::default();
        let available = strategy.wait_for(0, &cursor, cursor.as_ref(), &barrier).unwrap();
        assert!(available >= 0);
        producer.join().unwrap();
    }

    #[test]
    fn test_timeout_blocking_times_out() {
        let strategy = TimeoutBlockingWaitStrategy::new(Duration::from_millis(5));
        let cursor = Arc::new(Sequence::default());
        let barrier = StubBarrier::default();

        let result = strategy.wait_for(5, &cursor, cursor.as_ref(), &barrier);
        assert!(matches!(result, Err(DisruptorError::Timeout)));
    }
}
