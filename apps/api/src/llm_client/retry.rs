//! Backoff state machine and progress events.
//!
//! `RetryPolicy` is pure: given the attempt number and the failure class it
//! says whether to try again and how long to wait. Presentation lives behind
//! `ProgressSink`, which receives a `RetryEvent` stream and can render it any way.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::FailureKind;

pub const MAX_ATTEMPTS: u32 = 4;

/// Backoff schedule for one call sequence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed delay before the very first attempt.
    pub warm_up: Duration,
    /// Overload waits are `overload_base * 2^attempt` (3, 6, 12, 24s).
    pub overload_base: Duration,
    /// Rate-limit waits are `rate_limit_base * 2^attempt` (5, 10, 20, 40s).
    pub rate_limit_base: Duration,
    pub other_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            warm_up: Duration::from_secs(1),
            overload_base: Duration::from_secs(3),
            rate_limit_base: Duration::from_secs(5),
            other_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { wait: Duration },
    GiveUp,
}

impl RetryPolicy {
    /// Decides what follows a failed attempt. `attempt` is zero-based.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> Decision {
        if attempt + 1 >= self.max_attempts {
            return Decision::GiveUp;
        }
        let factor = 1u32 << attempt;
        let wait = match kind {
            FailureKind::Overload => self.overload_base * factor,
            FailureKind::RateLimited => self.rate_limit_base * factor,
            FailureKind::Other => self.other_delay,
        };
        Decision::Retry { wait }
    }
}

/// Remaining whole seconds reported at each one-second tick of a wait.
/// A 3s wait yields `[3, 2, 1]`; a fractional tail rounds up.
pub fn countdown(wait: Duration) -> Vec<u64> {
    let mut ticks = Vec::new();
    let mut remaining = wait;
    while !remaining.is_zero() {
        ticks.push(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0));
        remaining = remaining.saturating_sub(Duration::from_secs(1));
    }
    ticks
}

// ────────────────────────────────────────────────────────────────────────────
// Progress events
// ────────────────────────────────────────────────────────────────────────────

/// Observable steps of a call sequence. Attempt numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RetryEvent {
    CacheHit,
    Attempt {
        attempt: u32,
        max_attempts: u32,
    },
    Failed {
        attempt: u32,
        kind: FailureKind,
        message: String,
    },
    Waiting {
        attempt: u32,
        kind: FailureKind,
        remaining_secs: u64,
    },
    Succeeded {
        attempt: u32,
    },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: RetryEvent);
}

/// Renders events as log lines.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_event(&self, event: RetryEvent) {
        match event {
            RetryEvent::CacheHit => info!("Using cached response (no API call needed)"),
            RetryEvent::Attempt {
                attempt,
                max_attempts,
            } => debug!("API attempt {attempt}/{max_attempts}"),
            RetryEvent::Failed {
                attempt,
                kind,
                message,
            } => warn!("API attempt {attempt} failed ({kind:?}): {message}"),
            RetryEvent::Waiting {
                attempt,
                kind,
                remaining_secs,
            } => debug!("Retrying after {kind:?} on attempt {attempt}: {remaining_secs}s remaining"),
            RetryEvent::Succeeded { attempt } => debug!("API attempt {attempt} succeeded"),
        }
    }
}

/// Keeps every event so a handler can hand the sequence back to the client.
/// Events are also logged.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<RetryEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_events(self) -> Vec<RetryEvent> {
        self.events
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for RecordingProgress {
    fn on_event(&self, event: RetryEvent) {
        TracingProgress.on_event(event.clone());
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
