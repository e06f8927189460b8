//! Notification settings handlers.

use fleetwatch_core::CoreError;
use fleetwatch_core::Fleet;
use fleetwatch_core::api::{NotificationSettings, ThresholdRule};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand, NotificationsSetArgs};
use crate::error::CliError;
use crate::output;

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "-".into()
    } else {
        "****".into()
    }
}

/// Copy of `settings` safe to print in any output format.
fn redacted(settings: &NotificationSettings) -> NotificationSettings {
    let mut shown = settings.clone();
    if !shown.telegram_bot_token.is_empty() {
        shown.telegram_bot_token = "****".into();
    }
    if !shown.email_settings.password.is_empty() {
        shown.email_settings.password = "****".into();
    }
    shown
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn threshold(rule: &ThresholdRule) -> String {
    if rule.enabled {
        format!("above {:.0}%", rule.threshold)
    } else {
        "off".into()
    }
}

fn detail(s: &NotificationSettings) -> String {
    let email = &s.email_settings;
    let rules = &s.notifications;
    output::detail_block(&[
        ("Telegram token", mask(&s.telegram_bot_token)),
        (
            "Telegram chat",
            if s.telegram_chat_id.is_empty() {
                "-".into()
            } else {
                s.telegram_chat_id.clone()
            },
        ),
        ("Email", on_off(email.enabled).into()),
        (
            "SMTP",
            if email.smtp_host.is_empty() {
                "-".into()
            } else {
                format!("{}:{}", email.smtp_host, email.smtp_port)
            },
        ),
        ("SMTP password", mask(&email.password)),
        ("Recipients", email.to_emails.clone()),
        ("Agent offline", on_off(rules.agent_offline.enabled).into()),
        ("Container stop", on_off(rules.container_stopped.enabled).into()),
        ("CPU", threshold(&rules.cpu_threshold)),
        ("RAM", threshold(&rules.ram_threshold)),
    ])
}

/// `0` disables the rule; anything else must be a percentage.
fn set_threshold(rule: &mut ThresholdRule, field: &str, value: f64) -> Result<(), CliError> {
    if value.abs() < f64::EPSILON {
        rule.enabled = false;
        return Ok(());
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("{value} is not a percentage between 0 and 100"),
        });
    }
    rule.enabled = true;
    rule.threshold = value;
    Ok(())
}

/// Overlay the flags that were given onto the current settings.
fn apply(settings: &mut NotificationSettings, args: NotificationsSetArgs) -> Result<(), CliError> {
    if let Some(token) = args.telegram_bot_token {
        settings.telegram_bot_token = token;
    }
    if let Some(chat) = args.telegram_chat_id {
        settings.telegram_chat_id = chat;
    }
    if let Some(email) = args.email {
        settings.email_settings.enabled = email;
    }
    let rules = &mut settings.notifications;
    if let Some(on) = args.agent_offline {
        rules.agent_offline.enabled = on;
    }
    if let Some(on) = args.container_stopped {
        rules.container_stopped.enabled = on;
    }
    if let Some(v) = args.cpu_threshold {
        set_threshold(&mut rules.cpu_threshold, "cpu-threshold", v)?;
    }
    if let Some(v) = args.ram_threshold {
        set_threshold(&mut rules.ram_threshold, "ram-threshold", v)?;
    }
    Ok(())
}

pub async fn handle(
    fleet: &Fleet,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = fleet.client();

    match args.command {
        NotificationsCommand::Show => {
            let settings = client
                .notification_settings()
                .await
                .map_err(CoreError::from)?;
            let out = output::render_single(&global.output, &redacted(&settings), detail, |s| {
                on_off(s.email_settings.enabled).into()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Set(set) => {
            let settings = if let Some(path) = &set.from_file {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str::<NotificationSettings>(&text)?
            } else {
                let mut current = client
                    .notification_settings()
                    .await
                    .map_err(CoreError::from)?;
                apply(&mut current, set)?;
                current
            };

            let resp = client
                .update_notification_settings(&settings)
                .await
                .map_err(CoreError::from)?;
            output::note(
                global,
                &format!(
                    "✓ {}",
                    if resp.message.is_empty() {
                        "Notification settings saved"
                    } else {
                        resp.message.as_str()
                    }
                ),
            );
            Ok(())
        }

        NotificationsCommand::Test => {
            let resp = client
                .test_notifications()
                .await
                .map_err(CoreError::from)?;
            output::note(global, &format!("✓ {}", resp.message));
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args() -> NotificationsSetArgs {
        NotificationsSetArgs {
            from_file: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            email: None,
            agent_offline: None,
            container_stopped: None,
            cpu_threshold: None,
            ram_threshold: None,
        }
    }

    #[test]
    fn unspecified_flags_leave_settings_alone() {
        let mut settings = NotificationSettings {
            telegram_chat_id: "42".into(),
            ..NotificationSettings::default()
        };
        let before = settings.clone();
        apply(&mut settings, args()).unwrap();
        assert_eq!(settings, before);
    }

    #[test]
    fn zero_threshold_disables_rule() {
        let mut settings = NotificationSettings::default();
        apply(
            &mut settings,
            NotificationsSetArgs {
                cpu_threshold: Some(90.0),
                ram_threshold: Some(0.0),
                ..args()
            },
        )
        .unwrap();
        assert!(settings.notifications.cpu_threshold.enabled);
        assert!((settings.notifications.cpu_threshold.threshold - 90.0).abs() < f64::EPSILON);
        assert!(!settings.notifications.ram_threshold.enabled);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut settings = NotificationSettings::default();
        let err = apply(
            &mut settings,
            NotificationsSetArgs {
                cpu_threshold: Some(150.0),
                ..args()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn serialized_output_hides_secrets() {
        let mut settings = NotificationSettings {
            telegram_bot_token: "123:abc".into(),
            ..NotificationSettings::default()
        };
        settings.email_settings.password = "smtp-secret".into();

        let json = serde_json::to_string(&redacted(&settings)).unwrap();
        assert!(!json.contains("123:abc"));
        assert!(!json.contains("smtp-secret"));
        assert!(json.contains("****"));

        let empty = redacted(&NotificationSettings::default());
        assert!(empty.telegram_bot_token.is_empty(), "unset secrets stay unset");
    }

    #[test]
    fn secrets_are_masked() {
        let settings = NotificationSettings {
            telegram_bot_token: "123:abc".into(),
            ..NotificationSettings::default()
        };
        let out = detail(&settings);
        assert!(out.contains("****"));
        assert!(!out.contains("123:abc"));
    }
}
