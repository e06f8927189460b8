//! CLI flag overrides on top of `fleetwatch-config` profiles.
//!
//! Core never sees these types -- it receives a pre-built `FleetConfig`.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_config::{Config, Profile};
use fleetwatch_core::{FileCredentialStore, Fleet, FleetConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use fleetwatch_config::{config_path, load_config_or_default, session_path};

/// The profile a command runs against, after flags are applied.
pub struct Resolved {
    pub name: String,
    pub profile: Option<Profile>,
    pub fleet: FleetConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Translate the active profile plus global flags into a `FleetConfig`.
///
/// Flags win over the profile. Without a profile, `--server` alone is
/// enough.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&name) {
        Some(p) => Some(p.clone()),
        None if global.server.is_some() => None,
        None if global.profile.is_some() => {
            let available: Vec<_> = cfg.profiles.keys().cloned().collect();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let mut fleet = match (&profile, &global.server) {
        (_, Some(server)) => {
            let base = profile.clone().unwrap_or_default();
            fleetwatch_config::profile_to_fleet_config(
                &Profile {
                    server: server.clone(),
                    ..base
                },
                &cfg.defaults,
            )?
        }
        (Some(p), None) => fleetwatch_config::profile_to_fleet_config(p, &cfg.defaults)?,
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if global.insecure {
        fleet.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        fleet.timeout = Duration::from_secs(secs);
    }

    Ok(Resolved {
        name,
        profile,
        fleet,
    })
}

/// Build the `Fleet` for the resolved profile with its persisted session
/// store attached.
pub fn connect(resolved: &Resolved) -> Result<Fleet, CliError> {
    let store = FileCredentialStore::new(session_path(&resolved.name));
    Ok(Fleet::new(resolved.fleet.clone(), Arc::new(store))?)
}

/// `connect`, then restore the persisted session. Fails when there is none.
pub fn connect_authenticated(resolved: &Resolved) -> Result<Fleet, CliError> {
    let fleet = connect(resolved)?;
    if fleet.session().restore()? {
        Ok(fleet)
    } else {
        Err(CliError::NotLoggedIn {
            profile: resolved.name.clone(),
        })
    }
}
