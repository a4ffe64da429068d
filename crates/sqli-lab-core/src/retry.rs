// SPDX-License-Identifier: Apache-2.0

//! Retry policy for connection acquisition.
//!
//! Acquisition retries on a fixed schedule: a constant delay between
//! attempts and a hard cap on the number of attempts, no jitter.

use std::time::Duration;

use backon::ConstantBuilder;

/// Default number of connection attempts.
pub const DEFAULT_ATTEMPTS: usize = 10;

/// Default delay between connection attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

/// Creates the constant backoff used for connection acquisition.
///
/// `attempts` counts the first try, so the builder allows
/// `attempts - 1` retries. An `attempts` of zero is treated as one.
///
/// # Arguments
///
/// * `attempts` - Total number of attempts, including the first
/// * `delay` - Fixed pause between two attempts
#[must_use]
pub fn connect_backoff(attempts: usize, delay: Duration) -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(delay)
        .with_max_times(retries_for(attempts))
}

/// Number of retries that yields `attempts` total attempts.
#[must_use]
pub fn retries_for(attempts: usize) -> usize {
    attempts.max(1) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_for_default() {
        assert_eq!(retries_for(DEFAULT_ATTEMPTS), 9);
    }

    #[test]
    fn test_retries_for_zero_attempts() {
        assert_eq!(retries_for(0), 0);
        assert_eq!(retries_for(1), 0);
    }

    #[test]
    fn test_connect_backoff_configuration() {
        let backoff = connect_backoff(DEFAULT_ATTEMPTS, DEFAULT_DELAY);
        // Verify it's a ConstantBuilder (type check at compile time)
        let _: ConstantBuilder = backoff;
    }
}
