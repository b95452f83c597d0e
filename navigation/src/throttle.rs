use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Ready,
    Blocked { until: Instant },
}

/// Why a call was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooSoon { wait: Duration },
    CoolingDown { remaining: Duration },
}

/// Client-side admission control for the routing API.
///
/// A call is admitted when at least `min_interval` has passed since the last
/// admitted call and no 429 cooldown is pending. Admitting a call records it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    gate: Gate,
    last_call: Option<Instant>,
    min_interval: Duration,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            gate: Gate::Ready,
            last_call: None,
            min_interval,
            cooldown,
        }
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Rejection> {
        if let Gate::Blocked { until } = self.gate {
            if now < until {
                return Err(Rejection::CoolingDown {
                    remaining: until - now,
                });
            }
            tracing::debug!("routing cooldown expired");
            self.gate = Gate::Ready;
        }

        if let Some(last) = self.last_call {
            let since = now.saturating_duration_since(last);
            if since < self.min_interval {
                return Err(Rejection::TooSoon {
                    wait: self.min_interval - since,
                });
            }
        }

        self.last_call = Some(now);
        Ok(())
    }

    /// Enters the cooldown after the API answered 429.
    pub fn on_rate_limited(&mut self, now: Instant) {
        let until = now + self.cooldown;
        tracing::warn!(
            "routing API rate limit hit, blocking calls for {}s",
            self.cooldown.as_secs()
        );
        self.gate = Gate::Blocked { until };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_millis(2_000), Duration::from_millis(60_000))
    }

    #[test]
    fn test_first_call_is_admitted() {
        let mut limiter = limiter();
        assert!(limiter.try_acquire(Instant::now()).is_ok());
    }

    #[test]
    fn test_calls_closer_than_min_interval_are_rejected() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        limiter.try_acquire(t0).unwrap();

        let rejected = limiter.try_acquire(t0 + Duration::from_millis(1_999));
        assert_eq!(
            rejected,
            Err(Rejection::TooSoon {
                wait: Duration::from_millis(1)
            })
        );
        assert!(limiter.try_acquire(t0 + Duration::from_millis(2_000)).is_ok());
    }

    #[test]
    fn test_rejected_call_does_not_reset_interval() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        limiter.try_acquire(t0).unwrap();
        limiter.try_acquire(t0 + Duration::from_millis(1_500)).unwrap_err();
        assert!(limiter.try_acquire(t0 + Duration::from_millis(2_100)).is_ok());
    }

    #[test]
    fn test_cooldown_after_rate_limit() {
        let mut limiter = limiter();
        let t0 = Instant::now();
        limiter.try_acquire(t0).unwrap();
        limiter.on_rate_limited(t0);

        assert!(matches!(
            limiter.try_acquire(t0 + Duration::from_secs(30)),
            Err(Rejection::CoolingDown { .. })
        ));
        assert!(matches!(
            limiter.try_acquire(t0 + Duration::from_millis(59_999)),
            Err(Rejection::CoolingDown { .. })
        ));
        assert!(limiter.try_acquire(t0 + Duration::from_millis(60_000)).is_ok());
        assert_eq!(limiter.gate(), Gate::Ready);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_at_most_one_admission_per_interval(
                offsets in prop::collection::vec(0u64..1_999, 1..20)
            ) {
                let mut limiter = limiter();
                let t0 = Instant::now();
                limiter.try_acquire(t0).unwrap();
                for offset in offsets {
                    prop_assert!(limiter.try_acquire(t0 + Duration::from_millis(offset)).is_err());
                }
            }

            #[test]
            fn prop_blocked_until_cooldown_elapses(offset in 0u64..120_000) {
                let mut limiter = limiter();
                let t0 = Instant::now();
                limiter.on_rate_limited(t0);
                let admitted = limiter.try_acquire(t0 + Duration::from_millis(offset)).is_ok();
                prop_assert_eq!(admitted, offset >= 60_000);
            }
        }
    }
}
