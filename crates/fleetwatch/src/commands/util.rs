//! Shared helpers for command handlers.

use std::io::IsTerminal;

use tokio::sync::watch;
use tokio_stream::StreamExt;
use uuid::Uuid;

use fleetwatch_core::{Fleet, PollerHandle, RawFields, SessionState};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Resolve an agent argument (UUID or exact name) to its id.
///
/// Names are matched case-insensitively; an ambiguous name is an error.
pub async fn resolve_agent(fleet: &Fleet, identifier: &str) -> Result<Uuid, CliError> {
    if let Ok(id) = identifier.parse::<Uuid>() {
        return Ok(id);
    }

    let agents = fleet.client().list_agents().await.map_err(fleetwatch_core::CoreError::from)?;
    let mut matches = agents
        .iter()
        .filter(|a| a.name.eq_ignore_ascii_case(identifier));

    match (matches.next(), matches.next()) {
        (Some(agent), None) => Ok(agent.id),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "agent".into(),
            reason: format!("'{identifier}' matches more than one agent; use its UUID"),
        }),
        (None, _) => Err(CliError::NotFound {
            resource_type: "agent".into(),
            identifier: identifier.into(),
            list_command: "agents list".into(),
        }),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Prompt(e.to_string()))
}

/// Parse repeated `key=value` arguments. The value may itself contain `=`.
pub fn parse_field_args(args: &[String]) -> Result<RawFields, CliError> {
    let mut fields = RawFields::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            return Err(CliError::Validation {
                field: "field".into(),
                reason: format!("expected KEY=VALUE, got '{arg}'"),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Validation {
                field: "field".into(),
                reason: format!("empty key in '{arg}'"),
            });
        }
        fields.insert(key.to_owned(), value.to_owned());
    }
    Ok(fields)
}

/// Redraw a poller's view on every update until Ctrl-C.
///
/// Failed refreshes keep the last rendered data and print a warning.
/// Losing the session ends the watch with an auth error.
pub async fn watch_poller<P, T>(
    fleet: &Fleet,
    handle: PollerHandle<P, T>,
    global: &GlobalOpts,
    render: impl Fn(&T) -> Result<String, CliError>,
) -> Result<(), CliError>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    let mut updates = handle.updates();
    let mut session: watch::Receiver<SessionState> = fleet.session().subscribe();
    let redraw = matches!(global.output, OutputFormat::Table) && std::io::stdout().is_terminal();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),

            changed = session.changed() => {
                if changed.is_err() || matches!(*session.borrow(), SessionState::Unauthenticated) {
                    break Err(CliError::AuthFailed {
                        profile: String::new(),
                        message: "session expired while watching".into(),
                    });
                }
            }

            next = updates.next() => {
                let Some(state) = next else { break Ok(()) };
                if state.generation == 0 {
                    continue;
                }
                if let Some(data) = &state.data {
                    let body = render(data)?;
                    if redraw {
                        print!("\x1b[2J\x1b[H");
                    }
                    output::print_output(&body, global.quiet);
                }
                if let Some(err) = &state.error {
                    eprintln!("warning: refresh failed: {err}");
                }
            }
        }
    };

    handle.shutdown().await;
    result
}
