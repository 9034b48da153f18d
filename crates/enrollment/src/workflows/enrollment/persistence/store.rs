use std::collections::HashMap;
use std::sync::Mutex;

/// Keys written to the session-scoped store.
pub mod keys {
    pub const FORM_DATA: &str = "applicationFormData";
    pub const FORM_COMPLETED: &str = "applicationFormCompleted";
    pub const DOCUMENT_STATUS: &str = "documentUploadStatus";
    pub const DOCUMENTS_UPLOADED: &str = "documentsUploaded";
    pub const SUBMITTED_APPLICATION: &str = "submittedApplication";
    pub const SKIP_DOCUMENT_WARNING: &str = "skipDocumentWarning";
    pub const SKIP_DOCUMENT_WARNING_DATE: &str = "skipDocumentWarningDate";

    pub fn document(slot_id: &str) -> String {
        format!("document_{slot_id}")
    }
}

/// Session-lived key/value store with a byte quota, modelled on browser session storage.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Bytes still available before writes start failing.
    fn remaining_quota(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storing '{key}' needs {needed} bytes but only {remaining} remain")]
    QuotaExceeded {
        key: String,
        needed: usize,
        remaining: usize,
    },
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("could not encode '{key}': {reason}")]
    Encode { key: String, reason: String },
}

/// In-process [`SessionStore`]; usage counts key and value bytes.
#[derive(Debug)]
pub struct MemorySessionStore {
    quota_bytes: usize,
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            quota_bytes,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn usage(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn keys(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => {
                let mut keys: Vec<String> = entries.keys().cloned().collect();
                keys.sort();
                keys
            }
            Err(_) => Vec::new(),
        }
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("session store mutex poisoned".to_string())
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let current = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
        let used = Self::usage(&entries) - current;
        let needed = key.len() + value.len();
        let remaining = self.quota_bytes.saturating_sub(used);
        if needed > remaining {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed,
                remaining,
            });
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn remaining_quota(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => self.quota_bytes.saturating_sub(Self::usage(&entries)),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwriting_a_key_reuses_its_allowance() {
        let store = MemorySessionStore::new(20);
        store.set("k", "0123456789".to_string()).expect("fits");
        store
            .set("k", "0123456789abcdef".to_string())
            .expect("replacement fits once the old value is released");
        assert_eq!(store.remaining_quota(), 20 - 17);
    }

    #[test]
    fn writes_beyond_quota_fail_without_side_effects() {
        let store = MemorySessionStore::new(8);
        let err = store
            .set("key", "too long".to_string())
            .expect_err("over quota");
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                key: "key".to_string(),
                needed: 11,
                remaining: 8
            }
        );
        assert_eq!(store.get("key").expect("readable"), None);
    }

    #[test]
    fn document_keys_are_prefixed() {
        assert_eq!(keys::document("id-photo"), "document_id-photo");
    }
}
