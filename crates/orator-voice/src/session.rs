//! Session cancellation registry.
//!
//! Maps session ids to the cancellation token consulted by both halves of
//! the pipeline. The stop handler cancels the token; tokens are monotone —
//! once cancelled they stay cancelled for the life of the session. Entries
//! are removed at request end, so the table never accumulates.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// Process-wide table of in-flight sessions.
///
/// Uses a std (non-async) lock because every operation is synchronous and
/// the guard is never held across an `.await` point.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, CancellationToken>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its (fresh, uncancelled) token.
    ///
    /// Replaces any stale entry under the same id — a client reusing a
    /// session id starts with a clean token.
    pub fn create(&self, session_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), token.clone());
        token
    }

    /// Cancel a session's token. Returns whether the session was known.
    pub fn signal(&self, session_id: &str) -> bool {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(session_id).is_some_and(|token| {
            token.cancel();
            true
        })
    }

    /// Whether a session exists and has been signalled.
    #[must_use]
    pub fn is_signaled(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Remove a session's entry. A no-op for unknown ids.
    pub fn remove(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_signal_remove_lifecycle() {
        let registry = SessionRegistry::new();

        let token = registry.create("s1");
        assert!(!token.is_cancelled());
        assert!(!registry.is_signaled("s1"));

        assert!(registry.signal("s1"));
        assert!(token.is_cancelled());
        assert!(registry.is_signaled("s1"));

        registry.remove("s1");
        assert!(registry.is_empty());
        assert!(!registry.is_signaled("s1"));
    }

    #[test]
    fn signal_unknown_session_reports_not_found() {
        let registry = SessionRegistry::new();
        assert!(!registry.signal("nope"));
    }

    #[test]
    fn recreate_replaces_stale_entry_with_fresh_token() {
        let registry = SessionRegistry::new();

        let old = registry.create("s1");
        registry.signal("s1");
        assert!(old.is_cancelled());

        let fresh = registry.create("s1");
        assert!(!fresh.is_cancelled());
        assert!(!registry.is_signaled("s1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.create("a");
        let b = registry.create("b");

        registry.signal("a");
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }
}
