//! Action command handlers.

use std::io::IsTerminal;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;
use uuid::Uuid;

use fleetwatch_core::format::{action_status_tone, format_since};
use fleetwatch_core::{
    Action, ActionCommand, ActionQuery, ActionStatus, ActionType, CoreError, FieldKind, Fleet,
    PollerHandle, action_fields,
};

use crate::cli::{ActionsArgs, ActionsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Type")]
    action_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl ActionRow {
    fn new(a: &Action, color: bool) -> Self {
        Self {
            id: a.id.to_string(),
            agent: a.agent_id.to_string(),
            action_type: a.action_type.clone(),
            status: output::paint(&a.status.to_string(), action_status_tone(a.status), color),
            created: format_since(a.created, Utc::now()),
            result: outcome(a),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Type")]
    action_type: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Required")]
    required: String,
    #[tabled(rename = "Description")]
    help: String,
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Integer => "integer",
        FieldKind::Flag => "bool",
        FieldKind::Json => "json",
    }
}

fn field_rows() -> Vec<FieldRow> {
    ActionType::iter()
        .flat_map(|kind| {
            let fields = action_fields(kind);
            if fields.is_empty() {
                return vec![FieldRow {
                    action_type: kind.to_string(),
                    field: "-".into(),
                    kind: "-".into(),
                    required: "-".into(),
                    help: "no fields".into(),
                }];
            }
            fields
                .iter()
                .map(|f| FieldRow {
                    action_type: kind.to_string(),
                    field: f.name.into(),
                    kind: kind_label(f.kind).into(),
                    required: if f.required { "yes" } else { "no" }.into(),
                    help: f.help.into(),
                })
                .collect()
        })
        .collect()
}

/// First line of the error or response, whichever applies.
fn outcome(a: &Action) -> String {
    let text = match a.status {
        ActionStatus::Failed => a.error.as_deref(),
        _ => a.response.as_deref(),
    };
    text.and_then(|t| t.lines().next())
        .map_or_else(|| "-".into(), |l| l.chars().take(60).collect())
}

fn detail(a: &Action, color: bool) -> String {
    let mut pairs = vec![
        ("ID", a.id.to_string()),
        ("Agent", a.agent_id.to_string()),
        ("Type", a.action_type.clone()),
        (
            "Status",
            output::paint(&a.status.to_string(), action_status_tone(a.status), color),
        ),
        ("Created", a.created.to_rfc3339()),
        ("Completed", output::or_dash(a.completed.map(|t| t.to_rfc3339()))),
    ];
    if let Some(resp) = &a.response {
        pairs.push(("Response", resp.clone()));
    }
    if let Some(err) = &a.error {
        pairs.push(("Error", err.clone()));
    }
    output::detail_block(&pairs)
}

fn render(list: &[Action], global: &GlobalOpts, color: bool) -> Result<String, CliError> {
    output::render_list(
        &global.output,
        list,
        |a| ActionRow::new(a, color),
        |a| a.id.to_string(),
    )
}

/// Print a freshly queued action.
pub fn print_queued(action: &Action, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        action,
        |a| detail(a, color),
        |a| a.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    output::note(
        global,
        &format!("✓ {} queued as {}", action.action_type, action.id),
    );
    Ok(())
}

#[derive(Serialize)]
struct TypeInfo {
    #[serde(rename = "type")]
    action_type: ActionType,
    fields: Vec<FieldInfo>,
}

#[derive(Serialize)]
struct FieldInfo {
    name: &'static str,
    kind: &'static str,
    required: bool,
    help: &'static str,
}

fn type_infos() -> Vec<TypeInfo> {
    ActionType::iter()
        .map(|kind| TypeInfo {
            action_type: kind,
            fields: action_fields(kind)
                .iter()
                .map(|f| FieldInfo {
                    name: f.name,
                    kind: kind_label(f.kind),
                    required: f.required,
                    help: f.help,
                })
                .collect(),
        })
        .collect()
}

/// `actions types` needs no backend.
pub fn types(global: &GlobalOpts) -> Result<(), CliError> {
    let infos = type_infos();
    let out = output::render_single(
        &global.output,
        &infos,
        |_| {
            tabled::Table::new(field_rows())
                .with(tabled::settings::Style::rounded())
                .to_string()
        },
        |infos| {
            infos
                .iter()
                .map(|t| t.action_type.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn parse_action_type(raw: &str) -> Result<ActionType, CliError> {
    ActionType::from_str(raw).map_err(|_| CliError::Validation {
        field: "type".into(),
        reason: format!(
            "unknown action type '{raw}'; expected one of: {}",
            ActionType::iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

/// Types that delete something on the agent.
fn is_destructive(kind: ActionType) -> bool {
    matches!(kind, ActionType::RemoveContainer | ActionType::RemoveImage)
}

/// Follow a queued action through the action-list poller until the agent
/// reports an outcome or `timeout` passes.
async fn wait_for_outcome(
    handle: PollerHandle<ActionQuery, Vec<Action>>,
    action_id: Uuid,
    timeout: Duration,
    global: &GlobalOpts,
) -> Result<Action, CliError> {
    let mut rx = handle.subscribe();

    let spinner = if global.quiet || !std::io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("waiting for action {action_id}"));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let wait = async {
        loop {
            let found = rx
                .borrow_and_update()
                .data
                .as_ref()
                .and_then(|list| list.iter().find(|a| a.id == action_id).cloned());
            if let Some(action) = found.filter(|a| a.status.is_terminal()) {
                return Ok(action);
            }
            if rx.changed().await.is_err() {
                return Err(CliError::Internal("action poller stopped".into()));
            }
        }
    };

    let result = match tokio::time::timeout(timeout, wait).await {
        Ok(r) => r,
        Err(_) => Err(CliError::Timeout {
            seconds: timeout.as_secs(),
        }),
    };
    spinner.finish_and_clear();
    handle.shutdown().await;
    result
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(fleet: &Fleet, args: ActionsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ActionsCommand::List {
            agent,
            action_type,
            status,
            watch,
        } => {
            let agent_id = match agent {
                Some(a) => Some(util::resolve_agent(fleet, &a).await?),
                None => None,
            };
            let query = ActionQuery {
                agent_id,
                action_type,
                status,
            };

            if watch.watch {
                let handle = fleet.actions_poller(query);
                return util::watch_poller(fleet, handle, global, |list| {
                    render(list, global, color)
                })
                .await;
            }

            let list = fleet
                .client()
                .list_actions(&query)
                .await
                .map_err(CoreError::from)?;
            let out = render(&list, global, color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ActionsCommand::Submit {
            agent,
            action_type,
            fields,
            wait,
            wait_timeout,
        } => {
            let kind = parse_action_type(&action_type)?;
            let raw = util::parse_field_args(&fields)?;
            let command = ActionCommand::from_fields(kind, &raw)?;
            let agent_id = util::resolve_agent(fleet, &agent).await?;

            if is_destructive(kind)
                && !util::confirm(&format!("Submit {kind} to agent {agent_id}?"), global.yes)?
            {
                return Ok(());
            }

            // Started before submitting so the submit itself triggers the
            // fetch that picks up the new record.
            let history = wait.then(|| {
                fleet.actions_poller(ActionQuery {
                    agent_id: Some(agent_id),
                    ..ActionQuery::default()
                })
            });
            let submitter = match &history {
                Some(h) => fleet.action_submitter_for(h),
                None => fleet.action_submitter(),
            };

            let action = submitter.submit_command(agent_id, &command).await?;
            let Some(history) = history else {
                return print_queued(&action, global);
            };

            output::note(global, &format!("✓ {kind} queued as {}", action.id));
            let done = wait_for_outcome(
                history,
                action.id,
                Duration::from_secs(wait_timeout),
                global,
            )
            .await?;

            let out = output::render_single(
                &global.output,
                &done,
                |a| detail(a, color),
                |a| a.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);

            if done.status == ActionStatus::Failed {
                return Err(CliError::ActionFailed {
                    id: done.id.to_string(),
                    message: done.error.unwrap_or_else(|| "no error reported".into()),
                });
            }
            Ok(())
        }

        ActionsCommand::Types => types(global),
    }
}
