//! Minimum-interval gate between outbound API calls.
//!
//! `try_acquire` only reads; the caller records a dispatch when it actually
//! goes to the network, so cache hits never spend budget.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

pub const MIN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Acquire {
    pub allowed: bool,
    pub remaining_wait_seconds: f64,
}

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Option<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: None,
        }
    }

    pub fn try_acquire(&self) -> Acquire {
        let Some(last) = self.last_dispatch else {
            return Acquire {
                allowed: true,
                remaining_wait_seconds: 0.0,
            };
        };

        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            Acquire {
                allowed: false,
                remaining_wait_seconds: (self.min_interval - elapsed).as_secs_f64(),
            }
        } else {
            Acquire {
                allowed: true,
                remaining_wait_seconds: 0.0,
            }
        }
    }

    pub fn record_dispatch(&mut self) {
        self.last_dispatch = Some(Instant::now());
    }
}
