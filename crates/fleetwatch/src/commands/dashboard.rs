//! Dashboard handler: KPIs, top consumers and per-agent summary.

use chrono::Utc;
use tabled::Tabled;
use tabled::settings::Style;

use fleetwatch_core::api::{AgentSummary, ContainerUsage};
use fleetwatch_core::format::{
    agent_status_tone, format_byte_count, format_percent, format_since,
};
use fleetwatch_core::{CoreError, DashboardData, Fleet};

use crate::cli::{DashboardArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct TopRow {
    #[tabled(rename = "Container")]
    name: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

impl From<&ContainerUsage> for TopRow {
    fn from(c: &ContainerUsage) -> Self {
        Self {
            name: c.name.clone(),
            agent: c.agent_name.clone(),
            cpu: format_percent(c.cpu_usage),
            memory: format_percent(c.memory_usage),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Agent")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Ping")]
    last_ping: String,
    #[tabled(rename = "Containers")]
    containers: i64,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

impl SummaryRow {
    fn new(a: &AgentSummary, color: bool) -> Self {
        Self {
            name: a.name.clone(),
            status: output::paint(&a.status.to_string(), agent_status_tone(a.status), color),
            last_ping: a
                .last_ping
                .map_or_else(|| "never".into(), |t| format_since(t, Utc::now())),
            containers: a.container_count,
            cpu: format_percent(a.cpu_usage),
            memory: format_percent(a.memory_usage),
        }
    }
}

fn table<R: Tabled>(title: &str, rows: Vec<R>) -> String {
    if rows.is_empty() {
        return format!("{title}: none");
    }
    format!("{title}\n{}", tabled::Table::new(rows).with(Style::rounded()))
}

fn overview(d: &DashboardData, color: bool) -> String {
    let k = &d.kpis;
    let kpis = output::detail_block(&[
        ("Agents", format!("{} online / {} total", k.online_agents, k.total_agents)),
        (
            "Containers",
            format!("{} running / {} total", k.running_containers, k.total_containers),
        ),
        ("Images", k.total_images.to_string()),
        ("Volumes", k.total_volumes.to_string()),
        ("Networks", k.total_networks.to_string()),
        ("Avg CPU", format_percent(k.avg_cpu_usage)),
        ("Avg memory", format_percent(k.avg_memory_usage)),
        (
            "Traffic",
            format!(
                "rx {} / tx {}",
                format_byte_count(k.total_network_rx),
                format_byte_count(k.total_network_tx)
            ),
        ),
    ]);

    [
        kpis,
        table(
            "Top CPU",
            d.top_containers_cpu.iter().map(TopRow::from).collect(),
        ),
        table(
            "Top memory",
            d.top_containers_memory.iter().map(TopRow::from).collect(),
        ),
        table(
            "Agents",
            d.agents_summary
                .iter()
                .map(|a| SummaryRow::new(a, color))
                .collect(),
        ),
    ]
    .join("\n\n")
}

pub async fn handle(
    fleet: &Fleet,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let render = |d: &DashboardData| {
        output::render_single(&global.output, d, |d| overview(d, color), |d| {
            d.kpis.online_agents.to_string()
        })
    };

    if args.watch.watch {
        let handle = fleet.dashboard_poller();
        return util::watch_poller(fleet, handle, global, render).await;
    }

    let data = fleet.client().dashboard().await.map_err(CoreError::from)?;
    output::print_output(&render(&data)?, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_collapse_to_one_line() {
        let out = overview(&DashboardData::default(), false);
        assert!(out.contains("Agents:     0 online / 0 total"));
        assert!(out.contains("Top CPU: none"));
        assert!(out.contains("Top memory: none"));
    }
}
