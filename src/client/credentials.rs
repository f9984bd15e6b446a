//! Credential persistence
//!
//! The API key lives in the controller's memory for the session. It is
//! written to a durable store only after the user explicitly confirms, and
//! read back once when the controller loads. [`KeyringCredentialStore`] uses
//! the operating system's native credential store; [`MemoryCredentialStore`]
//! keeps values in-process.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{RagbridgeError, Result};

/// Durable key/value store for the credential
pub trait CredentialStore: Send + Sync {
    /// Load the value stored under `key`, if any
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be read
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns error if the backing store rejects the write
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Credential store backed by the OS keyring
///
/// Values are stored under the configured service name with `key` as the
/// account name.
///
/// # Examples
///
/// ```no_run
/// use ragbridge::client::{CredentialStore, KeyringCredentialStore};
///
/// let store = KeyringCredentialStore::new("ragbridge");
/// store.save("groq_api_key", "gsk_example").unwrap();
/// assert_eq!(store.load("groq_api_key").unwrap().as_deref(), Some("gsk_example"));
/// ```
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    /// Create a store namespaced under `service`
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(&self.service, key).map_err(RagbridgeError::Keyring)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(RagbridgeError::Keyring(e).into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let entry = keyring::Entry::new(&self.service, key).map_err(RagbridgeError::Keyring)?;
        entry.set_password(value).map_err(RagbridgeError::Keyring)?;
        Ok(())
    }
}

/// In-process credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one value
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| RagbridgeError::CredentialStore("store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| RagbridgeError::CredentialStore("store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
