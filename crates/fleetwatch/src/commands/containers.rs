//! Container command handlers.

use tabled::Tabled;

use fleetwatch_core::api::ContainerLog;
use fleetwatch_core::format::{
    container_status_tone, format_byte_count, format_megabytes, format_percent,
};
use fleetwatch_core::{Container, ContainerDetail, ContainerQuery, CoreError, Fleet};

use crate::cli::{ContainersArgs, ContainersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Restarts")]
    restarts: i64,
}

impl ContainerRow {
    fn new(c: &Container, color: bool) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name.clone(),
            agent: output::or_dash(c.agent_name.as_deref()),
            status: output::paint(&c.status, container_status_tone(&c.status), color),
            cpu: output::or_dash(c.cpu_usage_percent.map(format_percent)),
            memory: output::or_dash(c.memory_usage_mb.map(format_megabytes)),
            restarts: c.restart_count,
        }
    }
}

/// Container table shared with `agents containers`.
pub fn render(list: &[Container], global: &GlobalOpts, color: bool) -> Result<String, CliError> {
    output::render_list(
        &global.output,
        list,
        |c| ContainerRow::new(c, color),
        |c| c.id.to_string(),
    )
}

fn detail(d: &ContainerDetail, color: bool) -> String {
    let c = &d.container;
    let mut pairs = vec![
        ("ID", c.id.to_string()),
        ("Docker ID", c.container_id.clone()),
        ("Name", c.name.clone()),
        ("Image", c.image_id.clone()),
        (
            "Status",
            output::paint(&c.status, container_status_tone(&c.status), color),
        ),
        ("Restarts", c.restart_count.to_string()),
        ("Created", c.created_at.to_rfc3339()),
        ("IP", output::or_dash(c.ip_address.as_deref())),
        ("MAC", output::or_dash(c.mac_address.as_deref())),
        ("CPU", output::or_dash(c.cpu_usage_percent.map(format_percent))),
        ("Memory", output::or_dash(c.memory_usage_mb.map(format_megabytes))),
        (
            "Network",
            format!(
                "sent {} / received {}",
                format_byte_count(c.network_sent_bytes.unwrap_or(0)),
                format_byte_count(c.network_received_bytes.unwrap_or(0))
            ),
        ),
    ];
    if let Some(agent) = &d.agent {
        pairs.push(("Agent", format!("{} ({})", agent.name, agent.id)));
    }
    if let Some(last) = d.history.last() {
        pairs.push((
            "Last sample",
            format!(
                "{} cpu {} mem {}",
                last.timestamp.format("%H:%M:%S"),
                format_percent(last.cpu_usage_percent),
                format_megabytes(last.memory_usage_mb)
            ),
        ));
    }
    output::detail_block(&pairs)
}

/// Keep only the newest `tail` lines, oldest first.
fn tail_logs(mut logs: Vec<ContainerLog>, tail: Option<usize>) -> Vec<ContainerLog> {
    logs.sort_by_key(|l| l.timestamp);
    if let Some(n) = tail {
        let skip = logs.len().saturating_sub(n);
        logs.drain(..skip);
    }
    logs
}

fn log_lines(logs: &[ContainerLog]) -> String {
    logs.iter()
        .map(|l| {
            format!(
                "{} [{}] {}",
                l.timestamp.format("%Y-%m-%d %H:%M:%S"),
                l.stream,
                l.log_line.trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    fleet: &Fleet,
    args: ContainersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ContainersCommand::List {
            agent,
            status,
            search,
            watch,
        } => {
            let agent_id = match agent {
                Some(a) => Some(util::resolve_agent(fleet, &a).await?),
                None => None,
            };
            let query = ContainerQuery {
                agent_id,
                status,
                search,
            };

            if watch.watch {
                let handle = fleet.containers_poller(query);
                return util::watch_poller(fleet, handle, global, |list| {
                    render(list, global, color)
                })
                .await;
            }

            let list = fleet
                .client()
                .list_containers(&query)
                .await
                .map_err(CoreError::from)?;
            let out = render(&list, global, color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ContainersCommand::Get { id } => {
            let d = fleet
                .client()
                .get_container(id)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_single(
                &global.output,
                &d,
                |d| detail(d, color),
                |d| d.container.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ContainersCommand::Logs { id, tail } => {
            let logs = fleet
                .client()
                .container_logs(id)
                .await
                .map_err(CoreError::from)?;
            let logs = tail_logs(logs, tail);
            let out =
                output::render_single(&global.output, &logs, |l| log_lines(l), |l| log_lines(l))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
