use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::storage::{MemoryStorage, StorageBackend};

/// Minimal identity record the UI reads for gating decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// The full credential set for one session.
///
/// A record always carries both credentials; the store holds an
/// `Option<CredentialRecord>`, so the access and renewal credentials are
/// present together or absent together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub access_credential: String,
    pub renewal_credential: String,
    pub identity: Identity,
}

/// Process-wide credential holder.
///
/// All reads and writes go through one mutex, so `set` replaces every
/// field in a single step and no reader can observe a half-written
/// record. Durability is best effort: a backend failure is logged and
/// never fails the in-memory operation.
pub struct CredentialStore {
    current: Mutex<Option<CredentialRecord>>,
    backend: Box<dyn StorageBackend>,
}

impl CredentialStore {
    /// Create a store over the given backend, loading any persisted
    /// record. An unreadable backend starts the store empty.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let current = match backend.load() {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "Failed to load persisted credentials, starting empty");
                None
            }
        };
        Self {
            current: Mutex::new(current),
            backend: Box::new(backend),
        }
    }

    /// Ephemeral store with no durability, mainly for tests.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Replace the whole record. All three fields become visible to
    /// readers together.
    pub fn set(&self, record: CredentialRecord) {
        let mut current = self.lock();
        if let Err(err) = self.backend.store(&record) {
            warn!(error = %err, "Failed to persist credentials");
        }
        *current = Some(record);
    }

    /// Overwrite only the access credential, keeping the renewal
    /// credential and identity. No-op when no session is present.
    pub fn set_access_credential(&self, access_credential: &str) {
        let mut current = self.lock();
        if let Some(record) = current.as_mut() {
            record.access_credential = access_credential.to_string();
            if let Err(err) = self.backend.store(record) {
                warn!(error = %err, "Failed to persist renewed access credential");
            }
        }
    }

    pub fn access_credential(&self) -> Option<String> {
        self.lock().as_ref().map(|r| r.access_credential.clone())
    }

    pub fn renewal_credential(&self) -> Option<String> {
        self.lock().as_ref().map(|r| r.renewal_credential.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().as_ref().map(|r| r.identity.clone())
    }

    /// Whether a session record is present.
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// Remove all fields, in memory and in the backend.
    pub fn clear(&self) {
        let mut current = self.lock();
        if let Err(err) = self.backend.clear() {
            warn!(error = %err, "Failed to clear persisted credentials");
        }
        *current = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CredentialRecord>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
