//! Reconnect delay schedule.

use std::time::Duration;

/// Exponential reconnect policy with a bounded attempt budget.
///
/// Attempt `n` (1-based) waits `base_delay * 2^(n - 1)`, optionally capped by
/// `max_delay` and widened by jitter. With the defaults the schedule is
/// 1s, 2s, 4s, 8s, 16s and then nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: None,
            jitter: false,
        }
    }
}

impl ReconnectPolicy {
    /// Whether another attempt may be made after `attempts` have been spent.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// The deterministic delay for a 1-based attempt number.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay = 2u32
            .checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// The delay to actually wait, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter {
            return delay;
        }
        let spread = u64::try_from(delay.as_millis() / 2).unwrap_or(u64::MAX);
        delay.saturating_add(Duration::from_millis(rand::random_range(0..=spread)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, [1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn budget() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
        assert!(!policy.allows(6));
    }

    #[test]
    fn cap_applies() {
        let policy = ReconnectPolicy {
            max_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::MAX);
    }

    #[test]
    fn jitter_stays_within_half_again() {
        let policy = ReconnectPolicy {
            jitter: true,
            ..Default::default()
        };
        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }
}
