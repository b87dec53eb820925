//! Injectable scheduling jitter. The coordinator spreads invalidation
//! chunks over a randomized window so a mutation touching thousands of
//! users does not hammer the cache backend all at once; tests inject a
//! fixed delay instead of relying on ambient randomness.

use rand::Rng;
use std::time::Duration;

pub trait Jitter: Send + Sync {
    fn delay(&self) -> Duration;
}

/// Uniformly random delay within `[min, max]`.
pub struct RandomJitter {
    min: Duration,
    max: Duration,
}

impl RandomJitter {
    /// `max` is clamped up to `min` so a misconfigured window cannot panic
    /// the scheduler.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }
}

impl Jitter for RandomJitter {
    fn delay(&self) -> Duration {
        let millis = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Constant delay, for tests and for callers that want none.
pub struct FixedJitter(pub Duration);

impl Jitter for FixedJitter {
    fn delay(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_jitter_stays_within_window() {
        let jitter = RandomJitter::new(Duration::from_secs(1), Duration::from_secs(10));
        for _ in 0..200 {
            let delay = jitter.delay();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_inverted_window_collapses_to_min() {
        let jitter = RandomJitter::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(jitter.delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_fixed_jitter_is_constant() {
        let jitter = FixedJitter(Duration::from_millis(42));
        assert_eq!(jitter.delay(), Duration::from_millis(42));
        assert_eq!(jitter.delay(), Duration::from_millis(42));
    }
}
