use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::super::registry::SavePolicy;
use super::snapshot::PersistedFormSnapshot;
use super::store::{keys, SessionStore, StorageError};

/// Where a write ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted,
    /// The store rejected the write; state lives only in memory until the next success.
    MemoryOnly(StorageError),
}

impl SaveOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, SaveOutcome::Persisted)
    }
}

/// JSON read/write helpers over a [`SessionStore`] that log instead of failing.
pub(crate) fn write_json<S, T>(store: &S, key: &str, value: &T) -> SaveOutcome
where
    S: SessionStore + ?Sized,
    T: Serialize,
{
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            let err = StorageError::Encode {
                key: key.to_string(),
                reason: err.to_string(),
            };
            warn!(key = %key, error = %err, "session write skipped");
            return SaveOutcome::MemoryOnly(err);
        }
    };
    let bytes = encoded.len();
    match store.set(key, encoded) {
        Ok(()) => {
            debug!(key = %key, bytes, "session write");
            SaveOutcome::Persisted
        }
        Err(err) => {
            warn!(key = %key, bytes, error = %err, "session write failed; keeping in memory");
            SaveOutcome::MemoryOnly(err)
        }
    }
}

pub(crate) fn read_json<S, T>(store: &S, key: &str) -> Option<T>
where
    S: SessionStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key = %key, error = %err, "session read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key = %key, error = %err, "discarding unreadable session entry");
            None
        }
    }
}

pub(crate) fn remove_key<S>(store: &S, key: &str)
where
    S: SessionStore + ?Sized,
{
    if let Err(err) = store.remove(key) {
        warn!(key = %key, error = %err, "session remove failed");
    }
}

/// Persists the form snapshot and the completion flag.
pub struct FormStateStore<S> {
    store: Arc<S>,
}

impl<S> Clone for FormStateStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> FormStateStore<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn session_store(&self) -> &Arc<S> {
        &self.store
    }

    /// Never fails; storage errors are logged and reported through the outcome.
    pub fn save(&self, snapshot: &PersistedFormSnapshot) -> SaveOutcome {
        write_json(self.store.as_ref(), keys::FORM_DATA, snapshot)
    }

    pub fn load(&self) -> Option<PersistedFormSnapshot> {
        read_json(self.store.as_ref(), keys::FORM_DATA)
    }

    pub fn mark_completed(&self) -> SaveOutcome {
        match self.store.set(keys::FORM_COMPLETED, "true".to_string()) {
            Ok(()) => SaveOutcome::Persisted,
            Err(err) => {
                warn!(error = %err, "could not record form completion");
                SaveOutcome::MemoryOnly(err)
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.store.get(keys::FORM_COMPLETED), Ok(Some(flag)) if flag == "true")
    }

    pub fn clear(&self) {
        remove_key(self.store.as_ref(), keys::FORM_DATA);
        remove_key(self.store.as_ref(), keys::FORM_COMPLETED);
    }
}

/// What the scheduler wants done after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    SaveNow,
    Deferred { deadline: Instant },
}

/// Debounces free-text saves; discrete controls flush immediately.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn record(&mut self, policy: SavePolicy, now: Instant) -> SaveDecision {
        match policy {
            SavePolicy::Immediate => {
                self.deadline = None;
                SaveDecision::SaveNow
            }
            SavePolicy::Debounced => {
                let deadline = now + self.delay;
                self.deadline = Some(deadline);
                SaveDecision::Deferred { deadline }
            }
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending save if its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
