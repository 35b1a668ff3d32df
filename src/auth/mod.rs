//! Credential storage for the authenticated client.
//!
//! This module provides:
//! - `CredentialStore`: atomic process-wide holder for the access
//!   credential, renewal credential, and identity record
//! - `StorageBackend`: injected durability seam with in-memory and
//!   JSON-file implementations
//!
//! The store owns the record exclusively; only the login flow (full
//! write), the renewal protocol (access overwrite), and session
//! termination (clear) mutate it.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{CredentialRecord, CredentialStore, Identity};
