//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use fleetwatch_config::ConfigError;
use fleetwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend: {reason}")]
    #[diagnostic(
        code(fleetwatch::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(fleetwatch::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fleetwatch::auth_failed),
        help("Log in again with: fleetwatch login --profile {profile}")
    )]
    AuthFailed { profile: String, message: String },

    #[error("Not logged in (profile '{profile}')")]
    #[diagnostic(
        code(fleetwatch::not_logged_in),
        help("Run: fleetwatch login --profile {profile}")
    )]
    NotLoggedIn { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fleetwatch::not_found),
        help("Run: fleetwatch {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Conflict: {message}")]
    #[diagnostic(code(fleetwatch::conflict))]
    Conflict { message: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend error: {message}")]
    #[diagnostic(code(fleetwatch::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("Action was not queued: {message}")]
    #[diagnostic(
        code(fleetwatch::action_rejected),
        help("Check the agent is online: fleetwatch agents list")
    )]
    ActionRejected { message: String },

    #[error("Action {id} failed on the agent: {message}")]
    #[diagnostic(code(fleetwatch::action_failed))]
    ActionFailed { id: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Missing required field '{field}' for {action}")]
    #[diagnostic(
        code(fleetwatch::missing_field),
        help("Pass it with -f {field}=VALUE. Run: fleetwatch actions types")
    )]
    MissingField { field: String, action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fleetwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: fleetwatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(fleetwatch::no_config),
        help(
            "Create a profile with: fleetwatch config init\n\
             Or pass --server. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(fleetwatch::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {0}")]
    #[diagnostic(
        code(fleetwatch::prompt),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    Prompt(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(fleetwatch::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    #[diagnostic(code(fleetwatch::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotLoggedIn { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::MissingField { .. } | Self::Prompt(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to an auth failure.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile.to_owned(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::MissingField { field, action } => CliError::MissingField {
                field,
                action: action.to_string(),
            },

            CoreError::Validation { field, reason } | CoreError::PayloadFormat { field, reason } => {
                CliError::Validation { field, reason }
            }

            CoreError::Network { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::NotFound { message } => CliError::NotFound {
                resource_type: "resource".into(),
                identifier: message,
                list_command: "--help".into(),
            },

            CoreError::SubmissionFailed { message } => CliError::ActionRejected { message },

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::Storage { message } | CoreError::Internal(message) => {
                CliError::Internal(message)
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use fleetwatch_core::ActionType;

    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let cases = [
            (
                CoreError::Auth {
                    message: "expired".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::MissingField {
                    field: "image".into(),
                    action: ActionType::PullImage,
                },
                exit_code::USAGE,
            ),
            (
                CoreError::PayloadFormat {
                    field: "ports".into(),
                    reason: "bad json".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Conflict {
                    message: "name taken".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::Network {
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 10 }, exit_code::TIMEOUT),
            (
                CoreError::NotFound {
                    message: "agent".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::SubmissionFailed {
                    message: "boom".into(),
                },
                exit_code::GENERAL,
            ),
        ];

        for (core, code) in cases {
            let shown = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{shown}");
        }
    }
}
