//! Session table for the HTTP transports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Live sessions keyed by a random id.
///
/// Cloning shares the same table. Critical sections never await, so a std
/// mutex is used and entries can be removed from `Drop` impls.
#[derive(Debug)]
pub struct SessionManager<T> {
    sessions: Arc<Mutex<HashMap<String, T>>>,
}

impl<T> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
        }
    }
}

impl<T> Default for SessionManager<T> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> SessionManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, T>> {
        // Every mutation is a single insert or remove, so poisoning is ignored.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `entry` under a fresh id and return the id.
    pub fn create(&self, entry: T) -> String {
        self.create_with(|_| entry).0
    }

    /// Like [`create`](Self::create), for entries that need to know their own id.
    pub fn create_with<F>(&self, make: F) -> (String, T)
    where
        F: FnOnce(&str) -> T,
    {
        let id = Uuid::new_v4().simple().to_string();
        let entry = make(&id);
        self.table().insert(id.clone(), entry.clone());
        tracing::debug!(session = %id, "Session created");
        (id, entry)
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.table().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        let removed = self.table().remove(id);
        if removed.is_some() {
            tracing::debug!(session = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
