use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore, SessionStoreError};

/// In-memory Session Map keyed by shop domain.
///
/// Each `put` takes the write lock for a single insert, so concurrent
/// callbacks for the same shop resolve in lock order and the last one wins.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shops with a stored session.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, shop: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.sessions.read().await.get(shop).cloned())
    }

    async fn put(&self, shop: &str, record: SessionRecord) -> Result<(), SessionStoreError> {
        self.sessions.write().await.insert(shop.to_string(), record);
        Ok(())
    }
}
