use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::CredentialRecord;

/// Credential file name in the cache directory
const CREDENTIAL_FILE: &str = "credentials.json";

/// Durability seam for the credential store.
///
/// The store keeps its authoritative copy in memory; a backend only has to
/// persist the latest full record and hand it back on the next start.
pub trait StorageBackend: Send + Sync {
    /// Read the persisted record, or `None` if nothing was saved.
    fn load(&self) -> Result<Option<CredentialRecord>>;

    /// Persist the full record, replacing any previous one.
    fn store(&self, record: &CredentialRecord) -> Result<()>;

    /// Remove the persisted record.
    fn clear(&self) -> Result<()>;
}

/// Envelope written to disk; `saved_at` records when the credentials
/// were last persisted.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(flatten)]
    record: CredentialRecord,
    saved_at: DateTime<Utc>,
}

/// In-memory backend for tests and sessions that should not outlive the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<CredentialRecord>>,
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<Option<CredentialRecord>> {
        Ok(self.lock().clone())
    }

    fn store(&self, record: &CredentialRecord) -> Result<()> {
        *self.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

impl MemoryStorage {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CredentialRecord>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// JSON-file backend, the durable equivalent of browser local storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the platform cache directory,
    /// e.g. `~/.cache/<app_name>/credentials.json` on Linux.
    pub fn default_path(app_name: &str) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(app_name).join(CREDENTIAL_FILE))
    }
}

impl StorageBackend for FileStorage {
    fn load(&self) -> Result<Option<CredentialRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read credential file")?;
        let stored: StoredRecord =
            serde_json::from_str(&contents).context("Failed to parse credential file")?;
        Ok(Some(stored.record))
    }

    fn store(&self, record: &CredentialRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredRecord {
            record: record.clone(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents).context("Failed to write credential file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credential file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::Identity;

    fn record() -> CredentialRecord {
        CredentialRecord {
            access_credential: "A1".to_string(),
            renewal_credential: "R1".to_string(),
            identity: Identity {
                id: "u-1".to_string(),
                email: "scout@example.com".to_string(),
            },
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let storage = MemoryStorage::default();
        assert!(storage.load().unwrap().is_none());

        storage.store(&record()).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.access_credential, "A1");
        assert_eq!(loaded.renewal_credential, "R1");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("credentials.json"));

        assert!(storage.load().unwrap().is_none());
        storage.store(&record()).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.access_credential, "A1");
        assert_eq!(loaded.identity.email, "scout@example.com");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        // Clearing twice must not fail
        storage.clear().unwrap();
    }

    #[test]
    fn test_file_format_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let storage = FileStorage::new(path.clone());
        storage.store(&record()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("accessCredential"));
        assert!(raw.contains("renewalCredential"));
        assert!(raw.contains("saved_at"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(path);
        assert!(storage.load().is_err());
    }
}
