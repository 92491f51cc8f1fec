//! Runtime state: the persisted per-space record, its accessors, and the
//! single readers-writer guard the core holds it behind for the duration
//! of one invocation.
use std::sync::RwLock;

use chrono::Utc;

use crate::error::Result;

pub mod model;
pub mod persist;

pub use model::{CellState, FocusPointer, ObservedContext, RuntimeState, SpaceState};

/// Owns one [`RuntimeState`] behind a readers-writer lock, so that a
/// future longer-lived embedding stays safe even though the current
/// per-invocation CLI never actually contends on it.
pub struct StateStore {
    inner: RwLock<RuntimeState>,
}

impl StateStore {
    pub fn new(state: RuntimeState) -> Self {
        Self { inner: RwLock::new(state) }
    }

    /// Load from the canonical on-disk path, or start fresh.
    pub fn load() -> Result<Self> {
        Ok(Self::new(persist::load()?))
    }

    /// Run `f` with shared read access.
    pub fn read<T>(&self, f: impl FnOnce(&RuntimeState) -> T) -> T {
        let guard = self.inner.read().expect("state lock poisoned");
        f(&guard)
    }

    /// Run `f` with exclusive write access. Every call is a mutation by
    /// definition, so `updated_at` is bumped to the current time once `f`
    /// returns — callers never need to touch the timestamp themselves, and
    /// the pure load/save round-trip (which never goes through `write`)
    /// stays timestamp-stable.
    pub fn write<T>(&self, f: impl FnOnce(&mut RuntimeState) -> T) -> T {
        let mut guard = self.inner.write().expect("state lock poisoned");
        let result = f(&mut guard);
        guard.updated_at = Utc::now();
        result
    }

    /// Persist the current state to its canonical path.
    pub fn persist(&self) -> Result<()> {
        self.read(|state| persist::save(state))
    }

    /// Snapshot the current state (used by `state show`).
    pub fn snapshot(&self) -> RuntimeState {
        self.read(|state| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[test]
    fn write_then_read_observes_the_mutation() {
        let store = StateStore::new(RuntimeState::empty(Utc::now()));
        store.write(|state| {
            state.space_mut("1").layout_id = Some("main".into());
        });
        assert_eq!(store.read(|s| s.space("1").unwrap().layout_id.clone()), Some("main".into()));
    }

    #[test]
    fn write_bumps_updated_at() {
        let stale = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let store = StateStore::new(RuntimeState::empty(stale));
        store.write(|state| {
            state.space_mut("1").layout_id = Some("main".into());
        });
        assert!(store.read(|s| s.updated_at) > stale);
    }
}
