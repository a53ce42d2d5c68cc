use parking_lot::Mutex;
use std::collections::HashMap;

use crate::errors::CoreError;

/// Minimal string key/value store, modelled on browser local storage.
///
/// Reads and writes are synchronous. Implementations report failures;
/// `Preferences` decides to swallow them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// A store that refuses every operation, like local storage in a
/// private window with storage disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
        Err(CoreError::Storage("storage is disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
        Err(CoreError::Storage("storage is disabled".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), CoreError> {
        Err(CoreError::Storage("storage is disabled".into()))
    }
}
