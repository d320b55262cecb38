use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::types::{SessionKey, TransferSession};

/// Owns every in-progress [`TransferSession`] (thread-safe).
///
/// Single calls lock for their own duration. Read-modify-write sequences
/// go through [`with_sessions`](Self::with_sessions) so they run as one
/// critical section.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Sessions>,
}

/// The session map, reachable only while the store lock is held.
#[derive(Debug, Default)]
pub struct Sessions {
    map: HashMap<SessionKey, TransferSession>,
}

impl Sessions {
    pub fn get(&self, key: &SessionKey) -> Option<&TransferSession> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut TransferSession> {
        self.map.get_mut(key)
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts unconditionally, returning the session it replaced.
    pub fn put(&mut self, key: SessionKey, session: TransferSession) -> Option<TransferSession> {
        self.map.insert(key, session)
    }

    pub fn remove(&mut self, key: &SessionKey) -> Option<TransferSession> {
        self.map.remove(key)
    }

    /// Drops every session older than `ttl` at `now` and returns their keys.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<SessionKey> {
        let expired: Vec<SessionKey> = self
            .map
            .iter()
            .filter(|(_, s)| s.is_expired(now, ttl))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.map.remove(key);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to all sessions.
    pub fn with_sessions<R>(&self, f: impl FnOnce(&mut Sessions) -> R) -> R {
        f(&mut self.lock())
    }

    /// Returns a snapshot of a session.
    pub fn get(&self, key: &SessionKey) -> Option<TransferSession> {
        self.lock().get(key).cloned()
    }

    /// Inserts unconditionally, returning the session it replaced.
    pub fn put(&self, key: SessionKey, session: TransferSession) -> Option<TransferSession> {
        self.lock().put(key, session)
    }

    pub fn remove(&self, key: &SessionKey) -> Option<TransferSession> {
        self.lock().remove(key)
    }

    /// See [`Sessions::sweep_expired`].
    pub fn sweep_expired(&self, now: Instant, ttl: Duration) -> Vec<SessionKey> {
        self.lock().sweep_expired(now, ttl)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Poisoned locks are recovered; the map is only touched through
    // whole-entry operations.
    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Compression, Encoding};

    fn session_at(id: &str, created_at: Instant) -> TransferSession {
        TransferSession::new(
            id.into(),
            format!("{id}.bin"),
            2,
            Encoding::Base64,
            Compression::None,
            None,
            created_at,
        )
    }

    #[test]
    fn put_get_remove() {
        let store = SessionStore::new();
        let key = SessionKey::new("chat", "t1");
        assert!(store.get(&key).is_none());

        assert!(store.put(key.clone(), session_at("t1", Instant::now())).is_none());
        assert_eq!(store.get(&key).unwrap().transfer_id, "t1");
        assert_eq!(store.len(), 1);

        assert!(store.remove(&key).is_some());
        assert!(store.remove(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces_existing_session() {
        let store = SessionStore::new();
        let key = SessionKey::new("chat", "t1");
        let mut first = session_at("t1", Instant::now());
        first.insert_chunk(1, 2, "AAAA".into()).unwrap();
        store.put(key.clone(), first);

        let previous = store.put(key.clone(), session_at("t1", Instant::now()));
        assert_eq!(previous.unwrap().received_count(), 1);
        assert_eq!(store.get(&key).unwrap().received_count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_id_on_two_channels_is_two_sessions() {
        let store = SessionStore::new();
        store.put(SessionKey::new("a", "t1"), session_at("t1", Instant::now()));
        store.put(SessionKey::new("b", "t1"), session_at("t1", Instant::now()));
        assert_eq!(store.len(), 2);
        store.remove(&SessionKey::new("a", "t1"));
        assert!(store.get(&SessionKey::new("b", "t1")).is_some());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let store = SessionStore::new();
        let t0 = Instant::now();
        let ttl = Duration::from_secs(900);
        store.put(SessionKey::new("c", "old"), session_at("old", t0));
        store.put(
            SessionKey::new("c", "fresh"),
            session_at("fresh", t0 + Duration::from_secs(600)),
        );

        let now = t0 + Duration::from_secs(901);
        let removed = store.sweep_expired(now, ttl);
        assert_eq!(removed, vec![SessionKey::new("c", "old")]);
        assert!(store.get(&SessionKey::new("c", "fresh")).is_some());
        assert!(store.sweep_expired(now, ttl).is_empty());
    }

    #[test]
    fn with_sessions_mutates_in_place() {
        let store = SessionStore::new();
        let key = SessionKey::new("chat", "t1");
        store.put(key.clone(), session_at("t1", Instant::now()));

        let count = store.with_sessions(|sessions| {
            let s = sessions.get_mut(&key).unwrap();
            s.insert_chunk(1, 2, "AAAA".into()).unwrap()
        });
        assert_eq!(count, 1);
        assert_eq!(store.get(&key).unwrap().received_count(), 1);
    }

    #[test]
    fn concurrent_chunk_inserts() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(SessionStore::new());
        let mut handles = vec![];

        // 8 channels, each with its own 50-part session filled by one thread.
        for c in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let key = SessionKey::new(format!("chan-{c}"), "t");
                let mut session = session_at("t", Instant::now());
                session.total_parts = 50;
                store.put(key.clone(), session);
                for i in 1..=50 {
                    store.with_sessions(|s| {
                        s.get_mut(&key)
                            .unwrap()
                            .insert_chunk(i, 50, "QQ==".into())
                            .unwrap();
                    });
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        for c in 0..8 {
            let s = store.get(&SessionKey::new(format!("chan-{c}"), "t")).unwrap();
            assert!(s.is_complete());
        }
    }
}
