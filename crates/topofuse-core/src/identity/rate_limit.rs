// ── Token bucket for the vendor registry ──

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, to_delta};

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    window_start: DateTime<Utc>,
    cooldown_until: Option<DateTime<Utc>>,
}

/// `capacity` requests per `window`, refilled in full when a window ends.
///
/// Never blocks: callers that find the bucket empty treat the lookup as
/// unknown for this cycle.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            capacity,
            window,
            clock,
            state: Mutex::new(Bucket {
                tokens: capacity,
                window_start: now,
                cooldown_until: None,
            }),
        }
    }

    /// Take one token if available and no cooldown is in effect.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut bucket = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(until) = bucket.cooldown_until {
            if now < until {
                return false;
            }
            bucket.cooldown_until = None;
        }

        if now.signed_duration_since(bucket.window_start) >= to_delta(self.window) {
            bucket.tokens = self.capacity;
            bucket.window_start = now;
        }

        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }

    /// Refuse all requests for `duration` from now. Extends, never shortens,
    /// an active cooldown.
    pub fn cooldown(&self, duration: Duration) {
        let until = self.clock.now() + to_delta(duration);
        let mut bucket = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.cooldown_until = Some(bucket.cooldown_until.map_or(until, |cur| cur.max(until)));
        bucket.tokens = 0;
    }

    pub fn in_cooldown(&self) -> bool {
        let now = self.clock.now();
        let bucket = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.cooldown_until.is_some_and(|until| now < until)
    }
}
