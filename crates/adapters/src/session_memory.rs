//! In-memory session store
//!
//! Sessions live for the duration of one process run. Replacement is
//! atomic at the granularity of a single platform key.

use async_trait::async_trait;
use crosspost_domain::{Platform, PlatformSession, SessionError, SessionStore};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory session store implementation
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Platform, PlatformSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: PlatformSession) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| SessionError::Store(e.to_string()))?;
        sessions.insert(session.platform(), session);
        Ok(())
    }

    async fn get(&self, platform: Platform) -> Result<Option<PlatformSession>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(sessions.get(&platform).cloned())
    }

    async fn all(&self) -> Result<Vec<PlatformSession>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(Platform::ALL
            .iter()
            .filter_map(|p| sessions.get(p).cloned())
            .collect())
    }

    async fn clear(&self, platform: Platform) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| SessionError::Store(e.to_string()))?;
        sessions.remove(&platform);
        Ok(())
    }
}
