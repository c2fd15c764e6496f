use core::time::Duration;

pub const MAX_ATTEMPTS_MAX: u32 = 3;
pub const BASE_DELAY_DEFAULT: Duration = Duration::from_secs(1);

/// Bounded exponential backoff. The default makes a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: BASE_DELAY_DEFAULT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_MAX),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`, or `None` when `attempt` was the last one.
    pub fn delay_after(&self, attempt: u32, retry_after: Option<Duration>) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        Some(retry_after.unwrap_or_else(|| {
            self.base_delay
                .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_does_not_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_after(1, None), None);
    }

    #[test]
    fn test_delay_after() {
        let policy = RetryPolicy::new(10, Duration::from_secs(2));
        assert_eq!(policy.max_attempts(), MAX_ATTEMPTS_MAX);

        assert_eq!(policy.delay_after(1, None), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(2, None), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_after(3, None), None);

        assert_eq!(
            policy.delay_after(1, Some(Duration::from_secs(30))),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_new_clamps_to_one_attempt() {
        assert_eq!(RetryPolicy::new(0, BASE_DELAY_DEFAULT).max_attempts(), 1);
    }
}
