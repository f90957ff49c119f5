//! Reconnection schedule.

use std::time::Duration;

/// Fixed-delay, bounded-attempt reconnection schedule.
///
/// The delay is deliberately constant, not backed off: chat surfaces are
/// short-lived and the attempt count is small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            max_attempts,
        }
    }

    /// Delay before the next attempt, given `failures` consecutive failed
    /// connections so far. `None` means stop trying.
    pub fn next_delay(&self, failures: u32, intentional: bool) -> Option<Duration> {
        if intentional || failures >= self.max_attempts {
            None
        } else {
            Some(self.delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_until_max_attempts() {
        let policy = ReconnectPolicy::new(3000, 5);

        for failures in 1..5 {
            assert_eq!(
                policy.next_delay(failures, false),
                Some(Duration::from_millis(3000)),
                "failure {}",
                failures
            );
        }
        assert_eq!(policy.next_delay(5, false), None);
        assert_eq!(policy.next_delay(6, false), None);
    }

    #[test]
    fn test_intentional_close_never_reconnects() {
        let policy = ReconnectPolicy::new(3000, 5);
        assert_eq!(policy.next_delay(0, true), None);
        assert_eq!(policy.next_delay(1, true), None);
    }

    #[test]
    fn test_zero_max_attempts_never_reconnects() {
        let policy = ReconnectPolicy::new(100, 0);
        assert_eq!(policy.next_delay(0, false), None);
        assert_eq!(policy.next_delay(1, false), None);
    }
}
