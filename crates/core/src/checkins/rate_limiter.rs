//! Sliding-window limiter for check-in attempts.
//!
//! Held in process memory, keyed by `(tenant, participant)`; resetting on
//! process restart is acceptable. A horizontally scaled deployment would
//! swap this for a shared cache with atomic increment-with-expiry.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::{Error, Result};

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

pub struct CheckInRateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Mutex<HashMap<(String, String), VecDeque<Instant>>>,
}

impl Default for CheckInRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckInRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records one attempt and fails fast when the window is exhausted.
    /// Rejected attempts are not recorded, so a throttled caller recovers as
    /// soon as older attempts age out.
    pub fn check(&self, tenant_id: &str, participant_id: &str) -> Result<()> {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        // Age out expired attempts everywhere and drop emptied keys, so the
        // map tracks only people active inside the current window.
        attempts.retain(|_, entry| {
            while let Some(oldest) = entry.front() {
                if now.duration_since(*oldest) >= self.window {
                    entry.pop_front();
                } else {
                    break;
                }
            }
            !entry.is_empty()
        });

        let entry = attempts
            .entry((tenant_id.to_string(), participant_id.to_string()))
            .or_default();
        if entry.len() >= self.max_attempts {
            return Err(Error::RateLimited {
                participant_id: participant_id.to_string(),
            });
        }

        entry.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
