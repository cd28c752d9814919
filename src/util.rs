//! Utility functions shared by the sequencing components.

use crate::sequence::Sequence;
use std::sync::Arc;

/// Get the minimum sequence value from a set of sequences, bounded above
/// by `minimum_so_far`.
///
/// This is used by producers to find the slowest consumer: the fold starts
/// from the caller's own position, so an empty set yields `minimum_so_far`
/// unchanged and the caller is gated only by itself.
///
/// # Arguments
/// * `sequences` - The sequences to scan
/// * `minimum_so_far` - The initial bound for the fold
///
/// # Returns
/// The minimum over all sequence values and the provided bound
pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], minimum_so_far: i64) -> i64 {
    sequences
        .iter()
        .fold(minimum_so_far, |minimum, sequence| minimum.min(sequence.get()))
}

/// Calculate the base-2 logarithm of a power-of-two value.
///
/// The result is meaningless for non-powers of two; callers validate
/// the input first.
#[inline]
pub fn log2(n: usize) -> u32 {
    debug_assert!(is_power_of_two(n));
    n.trailing_zeros()
}

/// Check if a number is a power of 2
#[inline]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
