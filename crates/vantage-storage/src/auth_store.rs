//! Authentication key-value store
//!
//! Persists the bearer token and the serialized user record. Both keys are
//! written and removed together, so a reader never observes one without the
//! other. Contexts sharing the same database observe each other's writes
//! through the [`ChangeBus`]: a change is delivered to every context except
//! the one that made it, matching host storage-event semantics.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::Result;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "token";
/// Key under which the serialized user record is persisted.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The key was written with a new value.
    Set,
    /// The key was removed.
    Removed,
}

/// A single mutation of the store, tagged with the context that made it.
#[derive(Debug, Clone)]
pub struct StoreChange {
    /// Context id of the writer.
    pub origin: String,
    pub key: &'static str,
    pub kind: ChangeKind,
}

type ChangeCallback = Arc<dyn Fn(&StoreChange) + Send + Sync>;

struct BusEntry {
    context_id: String,
    callback: ChangeCallback,
}

struct BusInner {
    next_id: AtomicU64,
    watchers: RwLock<HashMap<u64, BusEntry>>,
}

/// Shared notification channel between stores over the same database.
#[derive(Clone)]
pub struct ChangeBus {
    inner: Arc<BusInner>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                watchers: RwLock::new(HashMap::new()),
            }),
        }
    }

    fn subscribe(&self, context_id: String, callback: ChangeCallback) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.watchers.write().insert(
            id,
            BusEntry {
                context_id,
                callback,
            },
        );
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.inner.watchers.write().remove(&id);
    }

    fn publish(&self, change: &StoreChange) {
        // Clone the callbacks out so none run under the watcher lock.
        let callbacks: Vec<ChangeCallback> = self
            .inner
            .watchers
            .read()
            .values()
            .filter(|entry| entry.context_id != change.origin)
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        for callback in callbacks {
            callback(change);
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription handle. Dropping it unsubscribes the callback.
pub struct Watcher {
    bus: ChangeBus,
    id: u64,
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

pub struct AuthStore {
    db: Database,
    bus: ChangeBus,
    /// Identifies this context on the bus; our own writes are not delivered
    /// back to us.
    context_id: String,
}

impl AuthStore {
    pub fn new(db: Database) -> Self {
        Self::with_bus(db, ChangeBus::new())
    }

    /// Create a store sharing a change bus with other contexts over the
    /// same database.
    pub fn with_bus(db: Database, bus: ChangeBus) -> Self {
        Self {
            db,
            bus,
            context_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn bus(&self) -> ChangeBus {
        self.bus.clone()
    }

    /// Persist the token and user record in one transaction.
    pub fn set_auth_data<U: Serialize>(&self, token: &str, user: &U) -> Result<()> {
        let user_json = serde_json::to_string(user)?;

        self.db.transaction(|conn| {
            Database::put_value(conn, TOKEN_KEY, token)?;
            Database::put_value(conn, USER_KEY, &user_json)?;
            Ok(())
        })?;

        self.announce(TOKEN_KEY, ChangeKind::Set);
        self.announce(USER_KEY, ChangeKind::Set);

        Ok(())
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.db.get_value(TOKEN_KEY)
    }

    /// Read the persisted user record. Returns `None` when the key is
    /// absent or when the stored JSON no longer parses.
    pub fn current_user<U: DeserializeOwned>(&self) -> Result<Option<U>> {
        let Some(raw) = self.db.get_value(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable stored user record");
                Ok(None)
            }
        }
    }

    /// Remove both keys in one transaction.
    pub fn clear_auth_data(&self) -> Result<()> {
        self.db.transaction(|conn| {
            Database::delete_value(conn, TOKEN_KEY)?;
            Database::delete_value(conn, USER_KEY)?;
            Ok(())
        })?;

        self.announce(TOKEN_KEY, ChangeKind::Removed);
        self.announce(USER_KEY, ChangeKind::Removed);

        Ok(())
    }

    /// Subscribe to changes made by other contexts. The callback must be
    /// idempotent; it can fire while the subscriber is mid-transition.
    pub fn on_external_change<F>(&self, callback: F) -> Watcher
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        let id = self.bus.subscribe(self.context_id.clone(), Arc::new(callback));
        Watcher {
            bus: self.bus.clone(),
            id,
        }
    }

    fn announce(&self, key: &'static str, kind: ChangeKind) {
        self.bus.publish(&StoreChange {
            origin: self.context_id.clone(),
            key,
            kind,
        });
    }
}

impl Clone for AuthStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            bus: self.bus.clone(),
            context_id: self.context_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestUser {
        id: i64,
        username: String,
    }

    fn alice() -> TestUser {
        TestUser {
            id: 1,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn test_auth_data_round_trip() {
        let store = AuthStore::new(Database::open_in_memory().unwrap());

        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.current_user::<TestUser>().unwrap(), None);

        store.set_auth_data("t1", &alice()).unwrap();

        assert_eq!(store.token().unwrap(), Some("t1".to_string()));
        assert_eq!(store.current_user::<TestUser>().unwrap(), Some(alice()));

        store.clear_auth_data().unwrap();

        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.current_user::<TestUser>().unwrap(), None);
    }

    #[test]
    fn test_unparseable_user_reads_as_none() {
        let db = Database::open_in_memory().unwrap();
        let store = AuthStore::new(db.clone());

        db.with_connection(|conn| Database::put_value(conn, USER_KEY, "not json"))
            .unwrap();

        assert_eq!(store.current_user::<TestUser>().unwrap(), None);
    }

    #[test]
    fn test_external_change_delivery() {
        let db = Database::open_in_memory().unwrap();
        let bus = ChangeBus::new();
        let store_a = AuthStore::with_bus(db.clone(), bus.clone());
        let store_b = AuthStore::with_bus(db, bus);

        let seen: Arc<Mutex<Vec<(&'static str, ChangeKind)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _watcher = store_a.on_external_change(move |change| {
            sink.lock().push((change.key, change.kind));
        });

        // Own writes are not delivered back.
        store_a.set_auth_data("t1", &alice()).unwrap();
        assert!(seen.lock().is_empty());

        // Another context's removal is.
        store_b.clear_auth_data().unwrap();
        let events = seen.lock().clone();
        assert!(events.contains(&(TOKEN_KEY, ChangeKind::Removed)));
        assert!(events.contains(&(USER_KEY, ChangeKind::Removed)));
    }

    #[test]
    fn test_dropped_watcher_stops_delivery() {
        let db = Database::open_in_memory().unwrap();
        let bus = ChangeBus::new();
        let store_a = AuthStore::with_bus(db.clone(), bus.clone());
        let store_b = AuthStore::with_bus(db, bus);

        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let watcher = store_a.on_external_change(move |change| {
            sink.lock().push(change.key);
        });

        drop(watcher);
        store_b.clear_auth_data().unwrap();
        assert!(seen.lock().is_empty());
    }
}
