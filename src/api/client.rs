//! Authenticated HTTP dispatcher with transparent credential renewal.
//!
//! Every outgoing call picks up the stored access credential as a bearer
//! header. Every failed response is classified: a hard auth failure
//! terminates the session, an expired-credential failure runs the
//! single-flight renewal protocol and retries the original call once,
//! anything else surfaces a user-facing notice and propagates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::{CredentialRecord, CredentialStore, Identity};
use crate::config::Config;
use crate::event::{SessionEvent, SessionEvents};

use super::ClientError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint; body carries the user's credentials.
const LOGIN_PATH: &str = "/v1/users/login";

/// Logout endpoint; best-effort server-side session teardown.
const LOGOUT_PATH: &str = "/v1/users/logout";

/// Credential renewal endpoint; exchanges the renewal credential for a
/// fresh access credential.
const REFRESH_PATH: &str = "/v1/users/refresh_token";

/// Status the backend uses when the credential is invalid or missing and
/// renewal cannot help.
const UNAUTHENTICATED_STATUS: u16 = 401;

/// Status the backend uses when the access credential is merely expired
/// and the renewal credential can still replace it.
const RENEW_STATUS: u16 = 410;

/// One in-flight renewal exchange, shared by every caller that observes
/// the expiry. The `Arc` around the error lets all waiters clone the
/// settled outcome.
type RenewalFuture = Shared<BoxFuture<'static, Result<(), Arc<ClientError>>>>;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    id: String,
    email: String,
    access_credential: String,
    renewal_credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    renewal_credential: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_credential: String,
}

/// The original request, captured so it can be reissued unchanged except
/// for the refreshed credential header.
#[derive(Debug, Clone)]
struct Call {
    method: Method,
    url: String,
    body: Option<Value>,
}

// ============================================================================
// Client
// ============================================================================

/// Authenticated API client.
/// Clone is cheap: all state is shared, and `reqwest::Client` pools
/// connections internally.
#[derive(Clone)]
pub struct AuthedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: Client,
    config: Config,
    store: Arc<CredentialStore>,
    /// At most one renewal exchange exists at a time; installed and
    /// cleared without awaiting while the lock is held.
    pending_renewal: Mutex<Option<RenewalFuture>>,
    events: SessionEvents,
}

impl AuthedClient {
    /// Create a client over the given backend configuration and store.
    pub fn new(config: Config, store: CredentialStore) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store: Arc::new(store),
                pending_renewal: Mutex::new(None),
                events: SessionEvents::new(),
            }),
        })
    }

    /// The credential store backing this client. External collaborators
    /// may read identity from it but must never write credential fields.
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Subscribe to session events (termination, failure notices).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ===== Typed helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.request(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body).map_err(ClientError::InvalidRequest)?;
        let response = self.request(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body).map_err(ClientError::InvalidRequest)?;
        let response = self.request(Method::PUT, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.request(Method::DELETE, path, None).await?;
        Self::decode(response).await
    }

    /// Dispatch a call through the full interceptor pipeline and return
    /// the raw response, for callers that need status or headers.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, ClientError> {
        let call = Call {
            method,
            url: self.inner.config.endpoint(path),
            body,
        };
        self.execute(call).await
    }

    // ===== Session lifecycle =====

    /// Authenticate and populate the credential store with the full
    /// record. Login bypasses response classification: a rejected login
    /// must not tear down an unrelated session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ClientError> {
        let url = self.inner.config.endpoint(LOGIN_PATH);
        let response = self
            .inner
            .http
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| self.inner.notify_transport(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ClientError::remote(status, &body);
            self.inner.notify(&err);
            return Err(err);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(format!("login response: {err}")))?;

        let identity = Identity {
            id: login.id,
            email: login.email,
        };
        self.inner.store.set(CredentialRecord {
            access_credential: login.access_credential,
            renewal_credential: login.renewal_credential,
            identity: identity.clone(),
        });
        debug!(email = %identity.email, "Login succeeded, credentials stored");
        Ok(identity)
    }

    /// End the session: best-effort server logout, clear the store,
    /// broadcast termination.
    pub async fn logout(&self) {
        self.inner.terminate_session().await;
    }

    // ===== Dispatch =====

    async fn execute(&self, call: Call) -> Result<Response, ClientError> {
        let mut renewed = false;
        loop {
            let response = match self.inner.send(&call).await {
                Ok(response) => response,
                Err(err) => {
                    // No response at all: surface the transport message
                    // and rethrow.
                    return Err(self.inner.notify_transport(err));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            match status.as_u16() {
                UNAUTHENTICATED_STATUS => {
                    debug!(url = %call.url, "Credential rejected, terminating session");
                    self.inner.terminate_session().await;
                    return Err(ClientError::Unauthenticated);
                }
                // A renewal-required failure with no renewal credential
                // cannot recover; take the hard-failure path instead of
                // calling the refresh endpoint with nothing.
                RENEW_STATUS if !renewed && self.inner.store.renewal_credential().is_none() => {
                    warn!(url = %call.url, "Expiry reported but no renewal credential held");
                    self.inner.terminate_session().await;
                    return Err(ClientError::Unauthenticated);
                }
                RENEW_STATUS if !renewed => {
                    debug!(url = %call.url, "Access credential expired, renewing");
                    self.renew_access_credential().await?;
                    renewed = true;
                    // Retry the original call exactly once with the
                    // now-current credential.
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    let err = ClientError::remote(status, &body);
                    self.inner.notify(&err);
                    return Err(err);
                }
            }
        }
    }

    /// Single-flight renewal: the first caller to observe an expiry
    /// starts the exchange; everyone else attaches to the same pending
    /// future. The slot is installed and read without awaiting under the
    /// lock, so no caller can observe a half-installed singleton.
    async fn renew_access_credential(&self) -> Result<(), ClientError> {
        let exchange = {
            let mut pending = self.inner.lock_renewal();
            match pending.as_ref() {
                Some(exchange) => exchange.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let exchange: RenewalFuture = async move {
                        let outcome = inner.run_renewal_exchange().await.map_err(Arc::new);
                        // Release the singleton before any waiter sees
                        // the settled outcome, success or failure alike.
                        inner.lock_renewal().take();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *pending = Some(exchange.clone());
                    exchange
                }
            }
        };

        exchange.await.map_err(ClientError::RenewalFailed)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let url = response.url().clone();
        response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(format!("{url}: {err}")))
    }
}

impl ClientInner {
    /// Build and send one attempt of a call, attaching the current
    /// access credential when one is held. Never blocks on a missing
    /// credential; authorization outcomes are classified on the response
    /// path.
    async fn send(&self, call: &Call) -> Result<Response, reqwest::Error> {
        let mut request = self.http.request(call.method.clone(), &call.url);
        if let Some(token) = self.store.access_credential() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }
        request.send().await
    }

    /// Perform the renewal exchange and apply its result. On success the
    /// store is updated before the shared future settles, so every
    /// retried call reads the new credential. On failure the session is
    /// terminated exactly as for a hard auth failure.
    async fn run_renewal_exchange(&self) -> Result<(), ClientError> {
        match self.exchange_renewal_credential().await {
            Ok(access_credential) => {
                self.store.set_access_credential(&access_credential);
                debug!("Access credential renewed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Credential renewal failed, terminating session");
                self.terminate_session().await;
                Err(err)
            }
        }
    }

    async fn exchange_renewal_credential(&self) -> Result<String, ClientError> {
        let renewal_credential = self
            .store
            .renewal_credential()
            .ok_or(ClientError::Unauthenticated)?;

        let url = self.config.endpoint(REFRESH_PATH);
        let response = self
            .http
            .put(&url)
            .json(&RefreshRequest {
                renewal_credential: &renewal_credential,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::remote(status, &body));
        }

        let refresh: RefreshResponse = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(format!("refresh response: {err}")))?;
        Ok(refresh.access_credential)
    }

    /// Session-termination sequence: best-effort remote logout, clear
    /// the store, broadcast termination. The logout call's own failure
    /// never blocks termination. Idempotent: a call classified after a
    /// concurrent failure already tore the session down finds the store
    /// empty and does nothing, so neither the logout call nor the
    /// termination broadcast is duplicated.
    async fn terminate_session(&self) {
        let Some(token) = self.store.access_credential() else {
            debug!("Session already ended, skipping termination");
            return;
        };

        let url = self.config.endpoint(LOGOUT_PATH);
        let request = self.http.delete(&url).bearer_auth(token);
        if let Err(err) = request.send().await {
            warn!(error = %err, "Logout call failed during session termination");
        }

        self.store.clear();
        self.events.emit(SessionEvent::Terminated);
    }

    /// Surface a user-facing notice for a remote failure.
    fn notify(&self, err: &ClientError) {
        if let ClientError::Remote { message, .. } = err {
            self.events.emit(SessionEvent::Notice {
                message: message.clone(),
            });
        }
    }

    /// Surface a transport failure as a notice and wrap it.
    fn notify_transport(&self, err: reqwest::Error) -> ClientError {
        self.events.emit(SessionEvent::Notice {
            message: err.to_string(),
        });
        ClientError::Transport(err)
    }

    fn lock_renewal(&self) -> MutexGuard<'_, Option<RenewalFuture>> {
        self.pending_renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
