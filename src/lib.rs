//! tokengate - an authenticated HTTP client session layer.
//!
//! The crate wraps a shared [`reqwest::Client`] behind a pair of
//! interceptors: outgoing calls carry the stored access credential as a
//! bearer header, and failed responses are classified so an expired
//! credential is renewed transparently. Renewal is single-flight: any
//! number of calls failing inside one expiry window trigger exactly one
//! exchange against the refresh endpoint, and each of them retries once
//! after it settles.
//!
//! UI concerns stay outside the crate. Subscribe to [`SessionEvent`] for
//! session termination and user-facing failure notices; read the
//! [`CredentialStore`] identity for gating decisions.
//!
//! ```no_run
//! use tokengate::{AuthedClient, Config, CredentialStore, FileStorage};
//!
//! # async fn run() -> Result<(), tokengate::ClientError> {
//! let storage = FileStorage::new(FileStorage::default_path("my-app").unwrap());
//! let client = AuthedClient::new(
//!     Config::new("https://api.example.com"),
//!     CredentialStore::new(storage),
//! )?;
//!
//! let identity = client.login("scout@example.com", "hunter2").await?;
//! let dashboard: serde_json::Value = client.get("/v1/dashboards/mine").await?;
//! # let _ = (identity, dashboard);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod event;

pub use api::{AuthedClient, ClientError};
pub use auth::{CredentialRecord, CredentialStore, FileStorage, Identity, MemoryStorage, StorageBackend};
pub use config::Config;
pub use event::SessionEvent;
