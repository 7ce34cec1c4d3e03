//! Registry of agent sessions attached to calls.

use crate::realtime::RealtimeSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Slot {
    Connecting,
    Live(Arc<dyn RealtimeSession>),
}

impl Slot {
    fn is_active(&self) -> bool {
        match self {
            Slot::Connecting => true,
            Slot::Live(session) => session.state().is_active(),
        }
    }
}

/// Agent sessions keyed by call cid.
///
/// At most one session per call is connecting or connected at a time.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Slots with closed or failed sessions evicted.
    fn active_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        let mut slots = self.slots();
        slots.retain(|_, slot| slot.is_active());
        slots
    }

    /// Claim `cid` for a new connection.
    ///
    /// Returns None while another session for the call is connecting or
    /// connected. A session that has since closed is replaced.
    pub fn reserve(&self, cid: &str) -> Option<Reservation<'_>> {
        let mut slots = self.active_slots();
        if slots.contains_key(cid) {
            return None;
        }

        slots.insert(cid.to_string(), Slot::Connecting);
        Some(Reservation {
            registry: self,
            cid: cid.to_string(),
            committed: false,
        })
    }

    /// Remove and return the live session for `cid`.
    pub fn remove(&self, cid: &str) -> Option<Arc<dyn RealtimeSession>> {
        let mut slots = self.slots();
        match slots.get(cid) {
            Some(Slot::Live(_)) => match slots.remove(cid) {
                Some(Slot::Live(session)) => Some(session),
                _ => None,
            },
            _ => None,
        }
    }

    /// Number of sessions currently connected.
    pub fn live_count(&self) -> usize {
        self.active_slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    /// Number of calls tracked, pending or live.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Claim on a call's slot. Released on drop unless committed.
pub struct Reservation<'a> {
    registry: &'a SessionRegistry,
    cid: String,
    committed: bool,
}

impl Reservation<'_> {
    /// Store the configured session under the reserved cid.
    pub fn commit(mut self, session: Arc<dyn RealtimeSession>) {
        self.registry
            .slots()
            .insert(self.cid.clone(), Slot::Live(session));
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.slots().remove(&self.cid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ConnectionState;
    use crate::testing::FakeSession;

    #[test]
    fn test_second_reservation_is_refused() {
        let registry = SessionRegistry::new();
        let first = registry.reserve("default:a");
        assert!(first.is_some());
        assert!(registry.reserve("default:a").is_none());
        assert!(registry.reserve("default:b").is_some());
    }

    #[test]
    fn test_dropped_reservation_is_released() {
        let registry = SessionRegistry::new();
        drop(registry.reserve("default:a"));
        assert!(registry.reserve("default:a").is_some());
    }

    #[test]
    fn test_live_session_blocks_until_closed() {
        let registry = SessionRegistry::new();
        let session = Arc::new(FakeSession::new());
        registry
            .reserve("default:a")
            .unwrap()
            .commit(session.clone());

        assert_eq!(registry.live_count(), 1);
        assert!(registry.reserve("default:a").is_none());

        session.set_state(ConnectionState::Failed);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.reserve("default:a").is_some());
    }

    #[test]
    fn test_closed_sessions_are_evicted() {
        let registry = SessionRegistry::new();
        let sessions: Vec<Arc<FakeSession>> =
            (0..100).map(|_| Arc::new(FakeSession::new())).collect();
        for (i, session) in sessions.iter().enumerate() {
            registry
                .reserve(&format!("default:{}", i))
                .unwrap()
                .commit(session.clone());
        }
        assert_eq!(registry.len(), 100);

        for session in &sessions {
            session.set_state(ConnectionState::Disconnected);
        }
        assert_eq!(registry.live_count(), 0);
        assert!(registry.is_empty());

        let _next = registry.reserve("default:next").unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_only_returns_live_sessions() {
        let registry = SessionRegistry::new();
        let _pending = registry.reserve("default:a").unwrap();
        assert!(registry.remove("default:a").is_none());

        registry
            .reserve("default:b")
            .unwrap()
            .commit(Arc::new(FakeSession::new()));
        assert!(registry.remove("default:b").is_some());
        assert!(registry.remove("default:b").is_none());
    }
}
