//! Cooldown between gateway restart requests.

use chrono::{DateTime, Duration, Utc};

/// Tracks when a restart was last requested. Time comes from the caller, so
/// the throttle has no clock of its own.
#[derive(Debug, Clone)]
pub struct RestartThrottle {
    cooldown: Duration,
    last_request: Option<DateTime<Utc>>,
}

impl RestartThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_request: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_request(&self) -> Option<DateTime<Utc>> {
        self.last_request
    }

    /// Time left before another request is allowed, if any.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_request?;
        let left = last + self.cooldown - now;
        (left > Duration::zero()).then_some(left)
    }

    /// Claim the next request slot at `now`, or return the time left.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> Result<(), Duration> {
        if let Some(left) = self.remaining(now) {
            return Err(left);
        }
        self.last_request = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn second_request_inside_cooldown_is_refused() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();
        let mut throttle = RestartThrottle::new(Duration::seconds(300));
        assert!(throttle.try_acquire(t0).is_ok());
        assert_eq!(
            throttle.try_acquire(t0 + Duration::seconds(120)),
            Err(Duration::seconds(180))
        );
        assert_eq!(throttle.last_request(), Some(t0));
        assert!(throttle.try_acquire(t0 + Duration::seconds(300)).is_ok());
        assert_eq!(throttle.last_request(), Some(t0 + Duration::seconds(300)));
    }

    #[test]
    fn fresh_throttle_has_nothing_remaining() {
        let throttle = RestartThrottle::new(Duration::seconds(300));
        assert_eq!(throttle.remaining(Utc::now()), None);
    }
}
