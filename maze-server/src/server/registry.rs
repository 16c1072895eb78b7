//! Registry of open client sessions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::audit::{AuditLog, EventKind};
use crate::models::SessionId;

/// Tracks live sessions and records their connect/disconnect events.
#[derive(Debug)]
pub struct SessionRegistry {
    live: Mutex<HashSet<SessionId>>,
    audit: Arc<AuditLog>,
}

impl SessionRegistry {
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
            audit,
        }
    }

    /// Allocate an identifier that no live session is using and record the
    /// connection.
    pub fn register(&self) -> SessionId {
        let id = {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            loop {
                let candidate = SessionId::random();
                if live.insert(candidate.clone()) {
                    break candidate;
                }
            }
        };
        self.audit
            .record(EventKind::ClientConnected, format!("Client ID: {id}"));
        id
    }

    /// Forget a session and record the disconnect. Unknown or already
    /// removed identifiers are ignored.
    pub fn unregister(&self, id: &SessionId) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed {
            self.audit
                .record(EventKind::ClientDisconnected, format!("Client ID: {id}"));
        }
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEntry;

    fn registry() -> (tempfile::TempDir, SessionRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(AuditLog::open(dir.path().join("activity.txt"), false));
        (dir, SessionRegistry::new(audit))
    }

    fn entries(registry: &SessionRegistry) -> Vec<AuditEntry> {
        std::fs::read_to_string(registry.audit.path())
            .unwrap()
            .lines()
            .filter_map(AuditEntry::parse_line)
            .collect()
    }

    #[test]
    fn test_register_and_unregister_once() {
        let (_dir, registry) = registry();

        let id = registry.register();
        assert_eq!(registry.len(), 1);
        registry.unregister(&id);
        registry.unregister(&id);
        assert!(registry.is_empty());

        let recorded = entries(&registry);
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].kind, EventKind::ClientConnected);
        assert_eq!(recorded[0].detail, format!("Client ID: {id}"));
        assert_eq!(recorded[1].kind, EventKind::ClientDisconnected);
        assert_eq!(recorded[1].detail, format!("Client ID: {id}"));
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let (_dir, registry) = registry();
        registry.unregister(&SessionId::from("nobody1"));
        assert!(entries(&registry).is_empty());
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let (_dir, registry) = registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || (0..64).map(|_| registry.register()).collect::<Vec<_>>())
            })
            .collect();
        let ids: Vec<SessionId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());
        assert_eq!(registry.len(), 16 * 64);

        for id in &ids {
            registry.unregister(id);
        }
        let recorded = entries(&registry);
        let connected = recorded
            .iter()
            .filter(|e| e.kind == EventKind::ClientConnected)
            .count();
        let disconnected = recorded
            .iter()
            .filter(|e| e.kind == EventKind::ClientDisconnected)
            .count();
        assert_eq!(connected, ids.len());
        assert_eq!(disconnected, ids.len());
    }
}
