//! # Session Registry
//!
//! The set of currently open WebSocket sessions. The registry is owned by the
//! server's [`AppState`](crate::state::AppState) and lives exactly as long as the
//! server: it is created empty at startup and cleared by [`SessionRegistry::shutdown`].
//!
//! ## Thread Safety:
//! Mutation happens only on connect, disconnect and shutdown, each under the write
//! lock, so at most one writer touches the registry at a time even when actix
//! runs sessions on several worker threads.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
}

/// One client connection.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    /// Remote address as reported by the connection, if known
    pub peer: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub state: SessionState,
}

#[derive(Debug)]
struct RegistryInner {
    sessions: HashMap<Uuid, Session>,
    /// False once the server has shut down
    accepting: bool,
}

/// Registry of open sessions with a fixed capacity.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                sessions: HashMap::new(),
                accepting: true,
            })),
            max_sessions,
        }
    }

    /// Register a newly accepted connection.
    ///
    /// ## Returns:
    /// - **Ok(id)**: The session is open
    /// - **Err(ServiceUnavailable)**: The limit is reached or the server is shutting down
    pub fn register(&self, peer: Option<String>) -> Result<Uuid, AppError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if !inner.accepting {
            return Err(AppError::ServiceUnavailable(
                "Server is shutting down".to_string(),
            ));
        }

        if inner.sessions.len() >= self.max_sessions {
            return Err(AppError::ServiceUnavailable(format!(
                "Maximum concurrent sessions ({}) reached",
                self.max_sessions
            )));
        }

        let id = Uuid::new_v4();
        inner.sessions.insert(
            id,
            Session {
                id,
                peer,
                opened_at: Utc::now(),
                state: SessionState::Open,
            },
        );

        Ok(id)
    }

    /// Remove a session. Returns it in the `Closed` state, or `None` if it was
    /// already gone (removing twice is harmless).
    pub fn deregister(&self, id: &Uuid) -> Option<Session> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.remove(id).map(|mut session| {
            session.state = SessionState::Closed;
            session
        })
    }

    pub fn is_open(&self, id: &Uuid) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.len()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Snapshot of all open sessions, oldest first.
    pub fn sessions(&self) -> Vec<Session> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut sessions: Vec<Session> = inner.sessions.values().cloned().collect();
        sessions.sort_by_key(|session| session.opened_at);
        sessions
    }

    /// Stop accepting sessions and drop all registered ones.
    ///
    /// Returns how many sessions were still open.
    pub fn shutdown(&self) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.accepting = false;
        let closed = inner.sessions.len();
        inner.sessions.clear();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_deregister() {
        let registry = SessionRegistry::new(10);
        let id = registry.register(Some("127.0.0.1:5000".to_string())).unwrap();

        assert!(registry.is_open(&id));
        assert_eq!(registry.len(), 1);

        let closed = registry.deregister(&id).unwrap();
        assert_eq!(closed.state, SessionState::Closed);
        assert_eq!(closed.peer.as_deref(), Some("127.0.0.1:5000"));
        assert!(!registry.is_open(&id));
        assert_eq!(registry.len(), 0);

        // Second removal is a no-op
        assert!(registry.deregister(&id).is_none());
    }

    #[test]
    fn test_session_limit() {
        let registry = SessionRegistry::new(2);
        let first = registry.register(None).unwrap();
        registry.register(None).unwrap();

        assert!(matches!(
            registry.register(None),
            Err(AppError::ServiceUnavailable(_))
        ));

        registry.deregister(&first);
        assert!(registry.register(None).is_ok());
    }

    #[test]
    fn test_shutdown_clears_and_refuses() {
        let registry = SessionRegistry::new(5);
        let id = registry.register(None).unwrap();
        registry.register(None).unwrap();

        assert_eq!(registry.shutdown(), 2);
        assert_eq!(registry.len(), 0);
        assert!(!registry.is_open(&id));
        assert!(matches!(
            registry.register(None),
            Err(AppError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn test_concurrent_registration_respects_limit() {
        let registry = SessionRegistry::new(50);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        let _ = registry.register(None);
                    }
                });
            }
        });

        assert_eq!(registry.len(), 50);
    }
}
