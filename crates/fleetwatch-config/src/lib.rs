//! Shared configuration for fleetwatch tools.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), the
//! on-disk location of persisted sessions, and translation to
//! `fleetwatch_core::FleetConfig`. The CLI layers its global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetwatch_core::{FleetConfig, TlsVerification};

const KEYRING_SERVICE: &str = "fleetwatch";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, else the configured
    /// default, else `"default"`.
    pub fn profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            name: name.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named backend profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://monitor.example.com").
    pub server: String,

    /// Operator username for `login`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Request timeout override, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    // Poll cadence overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_refresh_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_refresh_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_refresh_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_debounce_ms: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fleetwatch", "fleetwatch")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("fleetwatch");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the persisted session (token + user) for `profile` lives.
pub fn session_path(profile: &str) -> PathBuf {
    let file = format!("{}.json", sanitize(profile));
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("sessions").join(&file),
        |dirs| dirs.data_local_dir().join("sessions").join(&file),
    )
}

/// Profile names become file names.
fn sanitize(profile: &str) -> String {
    profile
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then
/// `FLEETWATCH_*` environment variables (`__` separates nesting, e.g.
/// `FLEETWATCH_DEFAULTS__TIMEOUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLEETWATCH_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the login password: `password_env`, then the OS keyring,
/// then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store the password for `profile_name` in the OS keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(password)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a backend URL.
pub fn parse_server_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected http or https, got '{other}'"),
        }),
    }
}

/// Build a `FleetConfig` from a profile and the global defaults, with no
/// CLI flag overrides.
pub fn profile_to_fleet_config(profile: &Profile, defaults: &Defaults) -> Result<FleetConfig, ConfigError> {
    let mut config = FleetConfig::new(parse_server_url(&profile.server)?);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(secs) = profile.agents_refresh_secs {
        config.agents_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.dashboard_refresh_secs {
        config.dashboard_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.detail_refresh_secs {
        config.detail_interval = Duration::from_secs(secs);
    }
    if let Some(ms) = profile.filter_debounce_ms {
        config.filter_debounce = Duration::from_millis(ms);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            default_profile: Some("prod".into()),
            ..Config::default()
        };
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                username: Some("ops".into()),
                agents_refresh_secs: Some(15),
                ..profile("https://monitor.example.com")
            },
        );
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profile_name(None), "prod");
        assert_eq!(loaded.profile("prod").unwrap(), cfg.profile("prod").unwrap());
        assert!(matches!(
            loaded.profile("staging"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_overrides_reach_fleet_config() {
        let p = Profile {
            timeout: Some(3),
            agents_refresh_secs: Some(15),
            filter_debounce_ms: Some(250),
            ca_cert: Some("/etc/ssl/fleet-ca.pem".into()),
            ..profile("https://monitor.example.com")
        };
        let fc = profile_to_fleet_config(&p, &Defaults::default()).unwrap();

        assert_eq!(fc.url.as_str(), "https://monitor.example.com/");
        assert_eq!(fc.timeout, Duration::from_secs(3));
        assert_eq!(fc.agents_interval, Duration::from_secs(15));
        assert_eq!(fc.dashboard_interval, Duration::from_secs(30));
        assert_eq!(fc.filter_debounce, Duration::from_millis(250));
        assert_eq!(fc.tls, TlsVerification::CustomCa("/etc/ssl/fleet-ca.pem".into()));
    }

    #[test]
    fn insecure_default_applies_when_profile_is_silent() {
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let fc = profile_to_fleet_config(&profile("http://10.0.0.5:8080"), &defaults).unwrap();
        assert_eq!(fc.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(fc.timeout, Duration::from_secs(10));
    }

    #[test]
    fn server_must_be_http() {
        assert!(matches!(
            profile_to_fleet_config(&profile("ftp://files"), &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_server_url("not a url").is_err());
    }

    #[test]
    fn plaintext_password_is_last_resort() {
        let p = Profile {
            password: Some("hunter2".into()),
            password_env: Some("FLEETWATCH_TEST_UNSET_PASSWORD_VAR".into()),
            ..profile("https://monitor.example.com")
        };
        // Unique profile name so no keyring entry can exist for it.
        let pw = resolve_password(&p, "config-test-plaintext-only").unwrap();
        assert_eq!(pw.expose_secret(), "hunter2");

        assert!(matches!(
            resolve_password(&profile("https://x"), "config-test-none"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn session_file_name_is_sanitized() {
        let path = session_path("prod/eu west");
        assert_eq!(path.file_name().unwrap(), "prod_eu_west.json");
        assert_eq!(path.parent().unwrap().file_name().unwrap(), "sessions");
    }
}
