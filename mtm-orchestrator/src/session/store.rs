//! Snapshot holder for the current session

use super::Session;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the current [`Session`] snapshot
///
/// Transitions replace the snapshot wholesale; nothing mutates a published
/// snapshot in place. Observers can `subscribe()` to be woken on every change.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Session::default()));
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Session> {
        self.tx.borrow().clone()
    }

    /// Apply a reducer to the current snapshot and publish the result
    pub fn update<F>(&self, reducer: F) -> Arc<Session>
    where
        F: FnOnce(&Session) -> Session,
    {
        self.tx.send_modify(|current| {
            let mut next = reducer(current);
            next.version = current.version + 1;
            *current = Arc::new(next);
        });
        self.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
