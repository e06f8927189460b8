// ── Core error types ──
//
// User-facing errors from fleetwatch-core. Consumers never see HTTP
// status codes or JSON parse failures directly: the
// `From<fleetwatch_api::Error>` impl sorts transport-layer errors into
// auth, network, conflict, not-found, and generic API buckets.

use thiserror::Error;

use fleetwatch_api::ActionType;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Auth ─────────────────────────────────────────────────────────
    /// Bad credentials at login, or the session was rejected (401).
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ── Input errors (never reach the network) ───────────────────────
    #[error("Missing required field '{field}' for {action}")]
    MissingField { field: String, action: ActionType },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Malformed value for '{field}': {reason}")]
    PayloadFormat { field: String, reason: String },

    // ── Network errors ───────────────────────────────────────────────
    #[error("Cannot reach backend: {reason}")]
    Network { reason: String },

    #[error("Backend did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Backend-reported errors ──────────────────────────────────────
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Action submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Credential storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Input problems caught before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::Validation { .. } | Self::PayloadFormat { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Connectivity failures: show a banner, keep the old data, retry later.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fleetwatch_api::Error> for CoreError {
    fn from(err: fleetwatch_api::Error) -> Self {
        use fleetwatch_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::Auth { message },
            ApiError::SessionExpired => CoreError::Auth {
                message: "session expired -- log in again".into(),
            },
            ApiError::Transport(e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::Network {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(message) => CoreError::Network {
                reason: format!("TLS error: {message}"),
            },
            ApiError::NotFound { message } => CoreError::NotFound { message },
            ApiError::Conflict { message } => CoreError::Conflict { message },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_taxonomy() {
        let conflict: CoreError = fleetwatch_api::Error::Conflict {
            message: "Agent with this name already exists".into(),
        }
        .into();
        assert!(matches!(conflict, CoreError::Conflict { .. }));

        let expired: CoreError = fleetwatch_api::Error::SessionExpired.into();
        assert!(expired.is_auth());

        let timeout: CoreError = fleetwatch_api::Error::Timeout { timeout_secs: 10 }.into();
        assert!(timeout.is_network());

        let missing = CoreError::MissingField {
            field: "container_id".into(),
            action: ActionType::StopContainer,
        };
        assert!(missing.is_validation());
        assert_eq!(
            missing.to_string(),
            "Missing required field 'container_id' for stop_container"
        );
    }
}
