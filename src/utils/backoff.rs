//! Exponential backoff utilities for retry operations.

use crate::constants::MAX_BACKOFF_DELAY_MS;
use std::time::Duration;

/// Computes the delay for a retry attempt.
///
/// Implements exponential backoff: `base`, `2 * base`, `4 * base`... capped at
/// [`MAX_BACKOFF_DELAY_MS`].
#[must_use]
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(std::cmp::min(base_ms.saturating_mul(factor), MAX_BACKOFF_DELAY_MS))
}

/// Performs exponential backoff with delay.
///
/// Sleeps the current thread for [`backoff_delay`] of this attempt.
///
/// # Arguments
/// * `base_ms` - Delay of the first retry in milliseconds
/// * `attempt` - Current retry attempt number (0-based)
///
/// # Returns
/// * `u32` - The next attempt number (incremented)
pub fn exponential_backoff_with_delay(base_ms: u64, attempt: u32) -> u32 {
    std::thread::sleep(backoff_delay(base_ms, attempt));
    attempt.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        assert_eq!(backoff_delay(10, 0), Duration::from_millis(10));
        assert_eq!(backoff_delay(10, 1), Duration::from_millis(20));
        assert_eq!(backoff_delay(10, 3), Duration::from_millis(80));
        assert_eq!(backoff_delay(10, 10), Duration::from_millis(MAX_BACKOFF_DELAY_MS));
    }

    #[test]
    fn test_backoff_large_attempt_does_not_overflow() {
        assert_eq!(backoff_delay(2, 200), Duration::from_millis(MAX_BACKOFF_DELAY_MS));
    }

    #[test]
    fn test_backoff_increments_attempt() {
        assert_eq!(exponential_backoff_with_delay(1, 0), 1);
        assert_eq!(exponential_backoff_with_delay(1, u32::MAX), u32::MAX);
    }
}
