//! Session identifiers and the table of live connections.
//!
//! One registry is owned by each [`crate::WavPlayer`]. Every operation takes
//! the same lock, which is never held while waiting for a reply.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::connection::Connection;

/// Caller-visible playback session identifier.
///
/// Unique among live sessions of one player; never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(NonZeroU32);

impl SessionId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(SessionId)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct RegistryState {
    last_id: u32,
    handles: HashMap<SessionId, Arc<Connection>>,
}

impl RegistryState {
    /// Increment, then use. Zero is skipped on wrap, as is any id still live.
    fn next_id(&mut self) -> SessionId {
        loop {
            self.last_id = self.last_id.wrapping_add(1);
            if let Some(id) = SessionId::new(self.last_id) {
                if !self.handles.contains_key(&id) {
                    return id;
                }
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct HandleRegistry {
    state: Mutex<RegistryState>,
}

impl HandleRegistry {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id and register the connection built for it.
    pub(crate) fn insert_with(
        &self,
        build: impl FnOnce(SessionId) -> Connection,
    ) -> Arc<Connection> {
        let mut state = self.lock();
        let id = state.next_id();
        let conn = Arc::new(build(id));
        state.handles.insert(id, conn.clone());
        conn
    }

    pub(crate) fn find(&self, id: SessionId) -> Option<Arc<Connection>> {
        self.lock().handles.get(&id).cloned()
    }

    /// Remove `conn` if its id still maps to that same connection.
    ///
    /// Returns `false` when another path already removed it.
    pub(crate) fn remove(&self, conn: &Arc<Connection>) -> bool {
        let mut state = self.lock();
        let same = state
            .handles
            .get(&conn.id())
            .is_some_and(|current| Arc::ptr_eq(current, conn));
        if same {
            state.handles.remove(&conn.id());
        }
        same
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().handles.len()
    }

    /// Empty the table, returning every connection that was live.
    pub(crate) fn drain(&self) -> Vec<Arc<Connection>> {
        self.lock().handles.drain().map(|(_, conn)| conn).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::os::unix::net::UnixStream;

    fn register(registry: &HandleRegistry) -> Arc<Connection> {
        let (local, _peer) = UnixStream::pair().unwrap();
        registry.insert_with(|id| Connection::new(id, local, None))
    }

    #[test]
    fn ids_start_above_zero_and_are_unique() {
        let registry = HandleRegistry::default();
        let ids: HashSet<_> = (0..32).map(|_| register(&registry).id()).collect();
        assert_eq!(ids.len(), 32);
        assert_eq!(ids.iter().min().map(|id| id.get()), Some(1));
        assert_eq!(registry.len(), 32);
    }

    #[test]
    fn allocation_wraps_past_zero_and_skips_live_ids() {
        let registry = HandleRegistry::default();
        let first = register(&registry);
        assert_eq!(first.id().get(), 1);

        registry.lock().last_id = u32::MAX - 1;
        assert_eq!(register(&registry).id().get(), u32::MAX);
        // 0 is the sentinel and 1 is still live.
        assert_eq!(register(&registry).id().get(), 2);
    }

    #[test]
    fn find_and_remove() {
        let registry = HandleRegistry::default();
        let conn = register(&registry);
        let id = conn.id();

        assert!(Arc::ptr_eq(&registry.find(id).unwrap(), &conn));
        assert!(registry.remove(&conn));
        assert!(registry.find(id).is_none());
        assert!(!registry.remove(&conn));
    }

    #[test]
    fn remove_ignores_reused_id() {
        let registry = HandleRegistry::default();
        let stale = register(&registry);
        let id = stale.id();
        registry.remove(&stale);

        registry.lock().last_id = id.get() - 1;
        let fresh = register(&registry);
        assert_eq!(fresh.id(), id);

        assert!(!registry.remove(&stale));
        assert!(registry.find(id).is_some());
        assert!(registry.remove(&fresh));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn drain_empties_table() {
        let registry = HandleRegistry::default();
        register(&registry);
        register(&registry);
        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.len(), 0);
    }
}
