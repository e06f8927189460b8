// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection,
// and HTTP status mapping. All endpoint modules (agents, containers, etc.)
// are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthObserver;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shape used by the backend: `{"error": "...", "message": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Raw HTTP client for the monitoring backend.
///
/// Holds the bearer token for the current session. The token is attached
/// to every request except login, and dropped on the first 401 response.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: RwLock<Option<SecretString>>,
    observer: RwLock<Option<Arc<dyn AuthObserver>>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The `base_url` is the backend root (e.g. `https://monitor.example.com`);
    /// endpoint paths are joined below it as `api/...`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
            timeout: transport.timeout,
            token: RwLock::new(None),
            observer: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            timeout: crate::transport::DEFAULT_TIMEOUT,
            token: RwLock::new(None),
            observer: RwLock::new(None),
        }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Credential management ────────────────────────────────────────

    /// Attach `token` to all subsequent requests.
    pub fn set_token(&self, token: SecretString) {
        debug!("storing bearer token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Stop attaching a bearer token.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Register the observer notified on every 401. Replaces any previous one.
    pub fn set_auth_observer(&self, observer: Arc<dyn AuthObserver>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Drop the token and tell the observer. Called on any 401.
    pub(crate) fn invalidate(&self) {
        warn!("backend rejected credential (HTTP 401), clearing session");
        self.clear_token();
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer.unauthorized();
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an `api/...` path onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub(crate) fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.get_with_params(path, &[]).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let mut builder = self.http.get(url);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        let resp = self
            .apply_auth(builder)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .apply_auth(self.http.post(url).json(body))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .apply_auth(self.http.post(url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self
            .apply_auth(self.http.put(url).json(body))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self
            .apply_auth(self.http.delete(url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check_status(resp).await.map(|_| ())
    }

    // ── Response handling ────────────────────────────────────────────

    /// Map non-success statuses into errors, invoking the 401 hook first.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate();
            return Err(Error::SessionExpired);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            } else {
                preview(&body).to_owned()
            }
        });

        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound { message },
            StatusCode::CONFLICT => Error::Conflict { message },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let resp = self.check_status(resp).await?;
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// Ensure the base URL ends with `/` so `Url::join` appends instead of
/// replacing the last path segment.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Pull a human-readable message out of a backend error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match (parsed.error, parsed.message) {
        (Some(error), Some(message)) if !message.is_empty() && message != error => {
            Some(format!("{error}: {message}"))
        }
        (Some(error), _) if !error.is_empty() => Some(error),
        (_, Some(message)) if !message.is_empty() => Some(message),
        _ => None,
    }
}

/// First 200 characters of a body, for error messages.
pub(crate) fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
