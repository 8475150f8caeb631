use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::core::DiscoveryController;
use crate::models::Entity;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session limit of {0} reached")]
    Full(u64),
}

/// Live sessions of one feed, keyed by session id
///
/// Each session owns its state outright; the registry only hands out
/// controllers. Sessions not touched for `idle_ttl` expire.
pub struct SessionRegistry<E: Entity> {
    sessions: Cache<Uuid, Arc<DiscoveryController<E>>>,
    max_sessions: u64,
}

impl<E: Entity> SessionRegistry<E> {
    pub fn new(max_sessions: u64, idle_ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_ttl)
            .build();

        Self {
            sessions,
            max_sessions,
        }
    }

    pub async fn open(&self, controller: Arc<DiscoveryController<E>>) -> Result<Uuid, RegistryError> {
        // Settle pending evictions so the count reflects live sessions only
        self.sessions.run_pending_tasks().await;
        if self.sessions.entry_count() >= self.max_sessions {
            return Err(RegistryError::Full(self.max_sessions));
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, controller).await;
        Ok(id)
    }

    /// Look up a session; a hit resets its idle timer
    pub async fn get(&self, id: &Uuid) -> Option<Arc<DiscoveryController<E>>> {
        self.sessions.get(id).await
    }

    pub async fn close(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).await.is_some()
    }

    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}
