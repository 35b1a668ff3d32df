//! Authenticated HTTP client module.
//!
//! `AuthedClient` is the single shared dispatcher every protected call
//! goes through. It injects the stored bearer credential on the way out
//! and classifies every outcome on the way back, renewing an expired
//! access credential at most once per call and at most once in flight
//! across all callers.

pub mod client;
pub mod error;

pub use client::AuthedClient;
pub use error::ClientError;
