// Login and the process-wide 401 hook.
//
// Login is the only call made without a bearer token. Every other call
// funnels through `ApiClient::handle_response`, which notifies the
// registered `AuthObserver` whenever the backend answers 401. A 401 from
// login itself fires the hook too: whatever session was held before is
// no longer trusted.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::{ApiClient, error_message, preview};
use crate::error::Error;
use crate::models::LoginResponse;

/// Receives a callback whenever an authenticated request is rejected.
///
/// Implementations must be cheap and non-blocking: the callback runs
/// inline on the task that observed the 401.
pub trait AuthObserver: Send + Sync {
    fn unauthorized(&self);
}

impl ApiClient {
    /// Exchange username/password for a bearer token.
    ///
    /// Does not store the returned token; the caller decides whether to
    /// call [`ApiClient::set_token`] (the session store does).
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, Error> {
        let url = self.url("api/login")?;
        debug!("POST {url} (login as {username})");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate();
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: error_message(&body)
                    .unwrap_or_else(|| "invalid username or password".into()),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("login failed (HTTP {status})")
                } else {
                    preview(&body).to_owned()
                }
            });
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}
