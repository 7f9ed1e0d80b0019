//! Per-session query history.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::context::{ContextSummary, ContextWindow};
use crate::domain::{PendingRecord, QueryRecord, ResearchError, Result};

/// In-memory session store.
///
/// `append` is the only mutator of a session's history and the only place
/// sequence numbers are assigned. It holds the write lock across the
/// read-length-then-push, so concurrent appends to one key serialize cleanly.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<QueryRecord>>>,
    window: ContextWindow,
}

impl SessionStore {
    pub fn new(window: ContextWindow) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            window,
        }
    }

    pub fn window(&self) -> ContextWindow {
        self.window
    }

    /// Create a session. Creating an existing key is a no-op.
    pub fn create(&self, key: &str) -> String {
        let mut sessions = self.sessions.write();
        if !sessions.contains_key(key) {
            sessions.insert(key.to_string(), Vec::new());
            debug!(session_key = %key, "session created");
        }
        key.to_string()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.read().contains_key(key)
    }

    /// Seal `pending` with the next sequence number and append it.
    pub fn append(&self, key: &str, pending: PendingRecord) -> Result<QueryRecord> {
        let mut sessions = self.sessions.write();
        let history = sessions
            .get_mut(key)
            .ok_or_else(|| unknown(key))?;
        let record = pending.seal(key, history.len() as u64);
        history.push(record.clone());
        debug!(session_key = %key, seq = record.sequence, "query record appended");
        Ok(record)
    }

    /// Full history in sequence order.
    pub fn history(&self, key: &str) -> Result<Vec<QueryRecord>> {
        self.sessions
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| unknown(key))
    }

    /// Number of records in a session.
    pub fn len(&self, key: &str) -> Result<usize> {
        self.sessions
            .read()
            .get(key)
            .map(Vec::len)
            .ok_or_else(|| unknown(key))
    }

    /// Summary over the last `window.size` records, computed on every call.
    pub fn context_summary(&self, key: &str) -> Result<ContextSummary> {
        let sessions = self.sessions.read();
        let history = sessions.get(key).ok_or_else(|| unknown(key))?;
        Ok(ContextSummary::from_history(history, self.window))
    }

    /// All known session keys, sorted.
    pub fn session_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop a session's history but keep the key.
    pub fn clear(&self, key: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let history = sessions.get_mut(key).ok_or_else(|| unknown(key))?;
        history.clear();
        debug!(session_key = %key, "session cleared");
        Ok(())
    }

    /// Forget a session entirely, returning its history.
    pub fn remove(&self, key: &str) -> Result<Vec<QueryRecord>> {
        self.sessions.write().remove(key).ok_or_else(|| unknown(key))
    }
}

fn unknown(key: &str) -> ResearchError {
    ResearchError::UnknownSession {
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(q: &str) -> PendingRecord {
        PendingRecord::new(q, format!("answer to {q}"), 100)
    }

    #[test]
    fn test_create_is_idempotent() {
        let store = SessionStore::default();
        assert_eq!(store.create("s1"), "s1");
        store.append("s1", pending("q0")).unwrap();
        assert_eq!(store.create("s1"), "s1");
        assert_eq!(store.len("s1").unwrap(), 1);
        assert_eq!(store.session_keys(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let store = SessionStore::default();
        let err = store.append("ghost", pending("q")).unwrap_err();
        assert!(matches!(err, ResearchError::UnknownSession { key } if key == "ghost"));
    }

    #[test]
    fn test_fresh_session_has_empty_history_and_summary() {
        let store = SessionStore::default();
        store.create("s1");
        assert!(store.history("s1").unwrap().is_empty());
        assert_eq!(store.context_summary("s1").unwrap().render(), "");
    }

    #[test]
    fn test_history_of_unknown_session_fails() {
        let store = SessionStore::default();
        assert!(store.history("nope").is_err());
        assert!(store.context_summary("nope").is_err());
    }

    #[test]
    fn test_sequences_are_gap_free() {
        let store = SessionStore::default();
        store.create("s1");
        for i in 0..4 {
            let r = store.append("s1", pending(&format!("q{i}"))).unwrap();
            assert_eq!(r.sequence, i);
        }
        let seqs: Vec<u64> = store.history("s1").unwrap().iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::default();
        store.create("a");
        store.create("b");
        store.append("a", pending("qa")).unwrap();
        let rb = store.append("b", pending("qb")).unwrap();
        assert_eq!(rb.sequence, 0);
        assert_eq!(store.history("a").unwrap()[0].query, "qa");
    }

    #[test]
    fn test_summary_reflects_latest_append() {
        let store = SessionStore::default();
        store.create("s1");
        store.append("s1", pending("first")).unwrap();
        assert!(store.context_summary("s1").unwrap().render().contains("first"));
        store.append("s1", pending("second")).unwrap();
        assert!(store.context_summary("s1").unwrap().render().contains("second"));
    }

    #[test]
    fn test_clear_restarts_sequences() {
        let store = SessionStore::default();
        store.create("s1");
        store.append("s1", pending("q")).unwrap();
        store.clear("s1").unwrap();
        assert!(store.contains("s1"));
        assert_eq!(store.append("s1", pending("q")).unwrap().sequence, 0);
    }

    #[test]
    fn test_remove_forgets_key() {
        let store = SessionStore::default();
        store.create("s1");
        store.append("s1", pending("q")).unwrap();
        let removed = store.remove("s1").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!store.contains("s1"));
    }
}
