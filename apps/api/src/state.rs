use crate::llm_client::RetryingClient;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds no per-user data itself: caches, limiters and transcripts live in
/// the `Session` each request resolves from `sessions`.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub llm: RetryingClient,
}
