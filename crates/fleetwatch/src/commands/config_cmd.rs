//! Config subcommand handlers.

use dialoguer::{Input, Select};

use fleetwatch_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    cfg
}

/// TOML view for `config show`.
fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# unprintable config: {e}"))
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

fn prompt_password() -> Result<String, CliError> {
    let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if pass.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(pass)
}

/// Keyring when the operator picks it, else the plaintext to write into
/// the profile.
fn store_password_choice(profile_name: &str, password: String) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Don't store; prompt at login",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => {
            fleetwatch_config::store_password(profile_name, &password)?;
            eprintln!("   ✓ password stored in system keyring");
            Ok(None)
        }
        1 => Ok(Some(password)),
        _ => Ok(None),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let path = config::config_path();
            eprintln!("fleetwatch configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let server: String = Input::new()
                .with_prompt("Backend URL")
                .default("http://localhost:8080".into())
                .validate_with(|s: &String| {
                    fleetwatch_config::parse_server_url(s)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Username")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let password = if username.is_empty() {
                None
            } else {
                store_password_choice(&profile_name, prompt_password()?)?
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    server,
                    username: (!username.is_empty()).then_some(username),
                    password,
                    ..Profile::default()
                },
            );
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            fleetwatch_config::save_config(&cfg)?;

            output::note(
                global,
                &format!(
                    "✓ Profile '{profile_name}' saved to {}\n   Next: fleetwatch -p {profile_name} login",
                    path.display()
                ),
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.profiles.keys().cloned().collect::<Vec<_>>().join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            cfg.profile(&name)?;
            let password = prompt_password()?;
            fleetwatch_config::store_password(&name, &password)?;
            output::note(global, &format!("✓ Password for '{name}' stored in system keyring"));
            Ok(())
        }
    }
}
