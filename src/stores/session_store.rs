use crate::models::principal::Principal;
use crate::utils::time::{current_timestamp, is_expired};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Opaque session token handed to clients (32 random bytes, hex encoded)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Narrow session interface handed to the HTTP layer. The access evaluator
/// never reads it; guards resolve the principal here and pass it in.
pub trait SessionStore: Send + Sync {
    fn get(&self, token: &SessionToken) -> Option<Arc<Principal>>;
    fn set(&self, token: SessionToken, principal: Principal);
    /// Returns true if a session was removed
    fn clear(&self, token: &SessionToken) -> bool;
    fn len(&self) -> usize;
    /// Drop expired sessions, returning how many were removed
    fn purge_expired(&self) -> usize;
    /// Ids of users holding at least one live session
    fn active_users(&self) -> HashSet<String>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SessionEntry {
    principal: Arc<Principal>,
    created_at: i64,
}

/// In-memory session store with a fixed lifetime per session
pub struct InMemorySessionStore {
    sessions: DashMap<SessionToken, SessionEntry>,
    ttl: i64,
}

impl InMemorySessionStore {
    pub fn new(ttl: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn with_capacity(capacity: usize, ttl: i64) -> Self {
        Self {
            sessions: DashMap::with_capacity(capacity),
            ttl,
        }
    }

    pub fn get_at(&self, token: &SessionToken, current_time: i64) -> Option<Arc<Principal>> {
        self.sessions
            .get(token)
            .filter(|entry| !is_expired(entry.created_at, self.ttl, current_time))
            .map(|entry| Arc::clone(&entry.principal))
    }

    pub fn set_at(&self, token: SessionToken, principal: Principal, current_time: i64) {
        self.sessions.insert(
            token,
            SessionEntry {
                principal: Arc::new(principal),
                created_at: current_time,
            },
        );
    }

    pub fn active_users_at(&self, current_time: i64) -> HashSet<String> {
        self.sessions
            .iter()
            .filter(|entry| !is_expired(entry.created_at, self.ttl, current_time))
            .map(|entry| entry.principal.id.clone())
            .collect()
    }

    pub fn cleanup_expired(&self, current_time: i64) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| !is_expired(entry.created_at, self.ttl, current_time));
        before.saturating_sub(self.sessions.len())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, token: &SessionToken) -> Option<Arc<Principal>> {
        self.get_at(token, current_timestamp())
    }

    fn set(&self, token: SessionToken, principal: Principal) {
        self.set_at(token, principal, current_timestamp());
    }

    fn clear(&self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn purge_expired(&self) -> usize {
        self.cleanup_expired(current_timestamp())
    }

    fn active_users(&self) -> HashSet<String> {
        self.active_users_at(current_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::principal::Role;

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(hex::decode(a.as_str()).is_ok());
    }

    #[test]
    fn test_set_get_clear() {
        let store = InMemorySessionStore::new(3600);
        let token = SessionToken::new("t1");

        store.set(token.clone(), Principal::new("u1", Role::Nurse));
        assert_eq!(store.get(&token).unwrap().role, Role::Nurse);
        assert_eq!(store.len(), 1);

        assert!(store.clear(&token));
        assert!(!store.clear(&token));
        assert!(store.get(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_not_returned() {
        let store = InMemorySessionStore::new(100);
        let token = SessionToken::new("t1");

        store.set_at(token.clone(), Principal::new("u1", Role::Doctor), 1_000);

        assert!(store.get_at(&token, 1_100).is_some());
        assert!(store.get_at(&token, 1_101).is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = InMemorySessionStore::with_capacity(8, 100);
        store.set_at(SessionToken::new("old"), Principal::new("u1", Role::Doctor), 1_000);
        store.set_at(SessionToken::new("new"), Principal::new("u2", Role::Nurse), 1_090);

        assert_eq!(store.cleanup_expired(1_150), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get_at(&SessionToken::new("new"), 1_150).is_some());
    }

    #[test]
    fn test_active_users_skips_expired() {
        let store = InMemorySessionStore::new(100);
        store.set_at(SessionToken::new("a"), Principal::new("u1", Role::Doctor), 1_000);
        store.set_at(SessionToken::new("b"), Principal::new("u1", Role::Doctor), 1_050);
        store.set_at(SessionToken::new("c"), Principal::new("u2", Role::Nurse), 900);

        let active = store.active_users_at(1_050);
        assert_eq!(active.len(), 1);
        assert!(active.contains("u1"));
    }
}
