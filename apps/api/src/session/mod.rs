// Per-session state: response cache, rate limiter, transcript and form context.
// Nothing here is process-wide; every operation receives the Session it acts on.

pub mod cache;
pub mod rate_limiter;
pub mod store;
pub mod transcript;

pub use cache::{Fingerprint, ResponseCache};
pub use rate_limiter::{Acquire, RateLimiter};
pub use store::SessionStore;
pub use transcript::{
    Category, Difficulty, EvaluationEntry, ExperienceLevel, Transcript, TranscriptEntry,
    TranscriptError,
};

/// Everything one interactive session owns.
#[derive(Debug, Default)]
pub struct Session {
    pub cache: ResponseCache,
    pub limiter: RateLimiter,
    pub transcript: Transcript,
    /// Summary of the most recently uploaded document, fed into question generation.
    pub document_summary: Option<String>,
    /// Round that new evaluations attach to when none is named explicitly.
    pub current_round: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form reset: forgets the uploaded document and the active round.
    /// Cache, rate limiter and transcript survive.
    pub fn reset_form(&mut self) {
        self.document_summary = None;
        self.current_round = None;
    }

    /// Empties the transcript. The active round pointer goes with it.
    pub fn clear_history(&mut self) {
        self.transcript.clear();
        self.current_round = None;
    }
}
