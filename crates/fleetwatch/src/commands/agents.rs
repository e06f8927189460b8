//! Agent command handlers.

use chrono::Utc;
use tabled::Tabled;

use fleetwatch_core::api::{
    AgentNginxConfig, CreateAgentRequest, NetworkDetail, SystemMetric, UpdateAgentRequest,
    VolumeDetail,
};
use fleetwatch_core::format::{
    agent_status_tone, format_byte_count, format_cpu_usage, format_percent, format_since,
};
use fleetwatch_core::{Agent, AgentDetail, CoreError, Facet, Fleet, ListFilter, Selection};

use crate::cli::{AgentsArgs, AgentsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{containers, images, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Last Ping")]
    last_ping: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl AgentRow {
    fn new(a: &Agent, color: bool) -> Self {
        let now = Utc::now();
        Self {
            id: a.id.to_string(),
            name: a.name.clone(),
            status: output::paint(&a.status.to_string(), agent_status_tone(a.status), color),
            ip: output::or_dash(a.public_ip.as_deref()),
            last_ping: a
                .last_ping
                .map_or_else(|| "never".into(), |t| format_since(t, now)),
            active: if a.is_active { "yes" } else { "no" }.into(),
        }
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
    #[tabled(rename = "RX")]
    rx: String,
    #[tabled(rename = "TX")]
    tx: String,
}

impl From<&SystemMetric> for MetricRow {
    fn from(m: &SystemMetric) -> Self {
        Self {
            time: m.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            cpu: format_percent(m.cpu_usage),
            memory: format_percent(m.memory_usage),
            disk: format_percent(m.disk_usage),
            rx: format_byte_count(m.network_rx),
            tx: format_byte_count(m.network_tx),
        }
    }
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Mountpoint")]
    mountpoint: String,
}

impl From<&VolumeDetail> for VolumeRow {
    fn from(v: &VolumeDetail) -> Self {
        Self {
            name: v.name.clone(),
            driver: v.driver.clone(),
            scope: v.scope.clone(),
            mountpoint: v.mountpoint.clone(),
        }
    }
}

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Internal")]
    internal: String,
}

impl From<&NetworkDetail> for NetworkRow {
    fn from(n: &NetworkDetail) -> Self {
        Self {
            id: n.id.chars().take(12).collect(),
            name: n.name.clone(),
            driver: n.driver.clone(),
            scope: n.scope.clone(),
            internal: if n.internal { "yes" } else { "no" }.into(),
        }
    }
}

#[derive(Tabled)]
struct NginxRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "SSL")]
    ssl: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Upstream")]
    upstream: String,
}

fn nginx_rows(cfg: &AgentNginxConfig) -> Vec<NginxRow> {
    cfg.configs
        .iter()
        .flat_map(|c| {
            c.routes.iter().map(move |r| NginxRow {
                domain: c.domain.clone(),
                ssl: if c.ssl_enabled { "yes" } else { "no" }.into(),
                path: r.path.clone(),
                upstream: format!("{}:{}", r.container_name, r.port),
            })
        })
        .collect()
}

fn detail(d: &AgentDetail, color: bool) -> String {
    let a = &d.agent;
    let m = &d.metrics;
    let mut pairs = vec![
        ("ID", a.id.to_string()),
        ("Name", a.name.clone()),
        (
            "Status",
            output::paint(&a.status.to_string(), agent_status_tone(a.status), color),
        ),
        ("Active", a.is_active.to_string()),
        ("IP", output::or_dash(a.public_ip.as_deref())),
        (
            "Last ping",
            a.last_ping
                .map_or_else(|| "never".into(), |t| format_since(t, Utc::now())),
        ),
        ("Created", a.created.to_rfc3339()),
        ("CPU", format_cpu_usage(m.cpu_usage)),
        (
            "Memory",
            format!(
                "{} ({} / {})",
                format_percent(m.memory_usage),
                format_byte_count(m.memory_used),
                format_byte_count(m.memory_total)
            ),
        ),
        (
            "Disk",
            format!(
                "{} ({} / {})",
                format_percent(m.disk_usage),
                format_byte_count(m.disk_used),
                format_byte_count(m.disk_total)
            ),
        ),
        (
            "Network",
            format!(
                "rx {} / tx {}",
                format_byte_count(m.network_rx),
                format_byte_count(m.network_tx)
            ),
        ),
        ("Containers", d.containers.len().to_string()),
        ("Images", d.images.len().to_string()),
        ("Volumes", d.volumes.len().to_string()),
        ("Networks", d.networks.len().to_string()),
    ];
    if let Some(token) = &a.token {
        pairs.push(("Token", token.clone()));
    }
    output::detail_block(&pairs)
}

fn list_filter(search: Option<String>, status: Option<&str>) -> ListFilter {
    let filter = ListFilter::new().facet(Facet::Status, Selection::parse(status.unwrap_or("")));
    match search {
        Some(q) => filter.query(q),
        None => filter,
    }
}

fn render_agents(
    agents: &[Agent],
    filter: &ListFilter,
    global: &GlobalOpts,
    color: bool,
) -> Result<String, CliError> {
    let visible: Vec<Agent> = filter.apply(agents).into_iter().cloned().collect();
    output::render_list(
        &global.output,
        &visible,
        |a| AgentRow::new(a, color),
        |a| a.id.to_string(),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(fleet: &Fleet, args: AgentsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let client = fleet.client();

    match args.command {
        AgentsCommand::List {
            search,
            status,
            watch,
        } => {
            let filter = list_filter(search, status.as_deref());
            if watch.watch {
                let handle = fleet.agents_poller();
                return util::watch_poller(fleet, handle, global, |agents| {
                    render_agents(agents, &filter, global, color)
                })
                .await;
            }
            let agents = client.list_agents().await.map_err(CoreError::from)?;
            let out = render_agents(&agents, &filter, global, color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Get { agent, watch } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let render = |d: &AgentDetail| {
                output::render_single(
                    &global.output,
                    d,
                    |d| detail(d, color),
                    |d| d.agent.id.to_string(),
                )
            };
            if watch.watch {
                let handle = fleet.agent_detail_poller(id);
                return util::watch_poller(fleet, handle, global, render).await;
            }
            let d = client.get_agent(id).await.map_err(CoreError::from)?;
            let out = render(&d)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Create { name } => {
            let agent = client
                .create_agent(&CreateAgentRequest { name })
                .await
                .map_err(CoreError::from)?;
            let out = output::render_single(
                &global.output,
                &agent,
                |a| {
                    output::detail_block(&[
                        ("ID", a.id.to_string()),
                        ("Name", a.name.clone()),
                        ("Token", output::or_dash(a.token.as_deref())),
                    ])
                },
                |a| a.token.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            output::note(global, "✓ Agent registered; start the agent daemon with this token");
            Ok(())
        }

        AgentsCommand::Update {
            agent,
            name,
            active,
        } => {
            if name.is_none() && active.is_none() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change; pass --name or --active".into(),
                });
            }
            let id = util::resolve_agent(fleet, &agent).await?;
            let updated = client
                .update_agent(
                    id,
                    &UpdateAgentRequest {
                        name,
                        is_active: active,
                    },
                )
                .await
                .map_err(CoreError::from)?;
            output::note(global, &format!("✓ Agent '{}' updated", updated.name));
            Ok(())
        }

        AgentsCommand::Delete { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            if !util::confirm(
                &format!("Delete agent {agent}? Its history is removed too."),
                global.yes,
            )? {
                return Ok(());
            }
            client.delete_agent(id).await.map_err(CoreError::from)?;
            output::note(global, &format!("✓ Agent {agent} deleted"));
            Ok(())
        }

        AgentsCommand::Metrics { agent, limit } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let metrics = client
                .agent_metrics(id, limit)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &metrics,
                |m| MetricRow::from(m),
                |m| m.timestamp.to_rfc3339(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Containers { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let list = client.agent_containers(id).await.map_err(CoreError::from)?;
            let out = containers::render(&list, global, color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Images { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let d = client.get_agent(id).await.map_err(CoreError::from)?;
            let out = images::render(&d.images, global)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Volumes { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let d = client.get_agent(id).await.map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &d.volumes,
                |v| VolumeRow::from(v),
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Networks { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let d = client.get_agent(id).await.map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &d.networks,
                |n| NetworkRow::from(n),
                |n| n.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::NginxConfig { agent } => {
            let id = util::resolve_agent(fleet, &agent).await?;
            let cfg = client
                .agent_nginx_config(id)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| {
                    if c.configs.is_empty() {
                        "No domains are served by this agent.".into()
                    } else {
                        tabled::Table::new(nginx_rows(c))
                            .with(tabled::settings::Style::rounded())
                            .to_string()
                    }
                },
                |c| {
                    c.configs
                        .iter()
                        .map(|n| n.domain.clone())
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetwatch_core::api::{NginxConfig, NginxRoute};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn nginx_rows_flatten_routes_per_domain() {
        let cfg = AgentNginxConfig {
            agent_id: Uuid::nil(),
            configs: vec![NginxConfig {
                domain: "app.example.com".into(),
                agent_ip: "203.0.113.7".into(),
                ssl_enabled: true,
                routes: vec![
                    NginxRoute {
                        path: "/".into(),
                        container_name: "web".into(),
                        port: 80,
                    },
                    NginxRoute {
                        path: "/api".into(),
                        container_name: "api".into(),
                        port: 8080,
                    },
                ],
            }],
        };
        let rows = nginx_rows(&cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].upstream, "api:8080");
        assert_eq!(rows[0].ssl, "yes");
    }

    #[test]
    fn status_all_is_no_filter() {
        assert!(list_filter(None, Some("all")).is_empty());
        assert!(!list_filter(None, Some("online")).is_empty());
        assert!(!list_filter(Some("edge".into()), None).is_empty());
    }
}
