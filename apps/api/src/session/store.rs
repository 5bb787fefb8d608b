//! Registry of live sessions.
//!
//! Each session sits behind its own `tokio::sync::Mutex`. Handlers hold that
//! lock across the whole API call sequence, which is what keeps a session to
//! one in-flight call at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::Session;

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(Session::new())));
        info!("Session {id} created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Ends a session. Its cache, limiter and transcript are dropped with it.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Fingerprint;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);

        let key = Fingerprint::new("summary", &["doc"]);
        store
            .get(a)
            .await
            .unwrap()
            .lock()
            .await
            .cache
            .store(key.clone(), "cached".to_string());

        let session_b = store.get(b).await.unwrap();
        assert!(session_b.lock().await.cache.lookup(&key).is_none());
    }

    #[tokio::test]
    async fn test_remove_ends_session() {
        let store = SessionStore::new();
        let id = store.create().await;
        assert_eq!(store.len().await, 1);
        assert!(store.remove(id).await);
        assert!(store.get(id).await.is_none());
        assert!(!store.remove(id).await);
    }
}
