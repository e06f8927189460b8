//! Domain and route command handlers.

use tabled::Tabled;

use fleetwatch_core::api::{
    CreateDomainRequest, CreateDomainRouteRequest, DomainRoute, DomainStatus, RouteStatus,
    UpdateDomainRequest, UpdateDomainRouteRequest,
};
use fleetwatch_core::format::container_status_tone;
use fleetwatch_core::{CoreError, Domain, DomainDetail, Fleet, ListFilter, StatusTone};

use crate::cli::{DomainsArgs, DomainsCommand, GlobalOpts, RoutesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    name: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "SSL")]
    ssl: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl DomainRow {
    fn new(d: &Domain, color: bool) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            agent: d.agent_name.clone().unwrap_or_else(|| d.agent_ip.clone()),
            ssl: yes_no(d.ssl_enabled).into(),
            active: active_label(d.is_active, color),
        }
    }
}

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Active")]
    active: String,
}

impl RouteRow {
    fn new(r: &DomainRoute, color: bool) -> Self {
        Self {
            id: r.id.to_string(),
            path: r.path.clone(),
            container: r.container_name.clone(),
            port: r.port,
            active: active_label(r.is_active, color),
        }
    }
}

#[derive(Tabled)]
struct RouteStatusRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Upstream")]
    upstream: String,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Container")]
    container: String,
}

impl RouteStatusRow {
    fn new(r: &RouteStatus, color: bool) -> Self {
        Self {
            path: r.path.clone(),
            upstream: format!("{}:{}", r.container_name, r.port),
            route: active_label(r.is_active, color),
            container: output::paint(
                &r.container_status,
                route_container_tone(&r.container_status),
                color,
            ),
        }
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

fn active_label(active: bool, color: bool) -> String {
    if active {
        output::paint("active", StatusTone::Good, color)
    } else {
        output::paint("inactive", StatusTone::Neutral, color)
    }
}

fn route_container_tone(status: &str) -> StatusTone {
    if status == "not_found" {
        StatusTone::Bad
    } else {
        container_status_tone(status)
    }
}

fn routes_table(routes: &[DomainRoute], color: bool) -> String {
    if routes.is_empty() {
        return "No routes.".into();
    }
    tabled::Table::new(routes.iter().map(|r| RouteRow::new(r, color)))
        .with(tabled::settings::Style::rounded())
        .to_string()
}

fn detail(d: &DomainDetail, color: bool) -> String {
    let dom = &d.domain;
    let agent = match &d.agent {
        Some(a) => format!("{} ({})", a.name, a.id),
        None => dom.agent_id.to_string(),
    };
    let head = output::detail_block(&[
        ("ID", dom.id.to_string()),
        ("Domain", dom.name.clone()),
        ("Agent", agent),
        ("Agent IP", dom.agent_ip.clone()),
        ("SSL", yes_no(dom.ssl_enabled).into()),
        ("Active", active_label(dom.is_active, color)),
        ("Updated", dom.updated.to_rfc3339()),
    ]);
    format!("{head}\n\n{}", routes_table(&d.routes, color))
}

fn status_detail(s: &DomainStatus, color: bool) -> String {
    let head = output::detail_block(&[
        ("Domain", s.domain_name.clone()),
        ("Agent", format!("{} ({})", s.agent_name, s.agent_ip)),
        ("SSL", yes_no(s.ssl_enabled).into()),
        ("Active", active_label(s.is_active, color)),
    ]);
    if s.routes.is_empty() {
        return format!("{head}\n\nNo routes.");
    }
    let table = tabled::Table::new(s.routes.iter().map(|r| RouteStatusRow::new(r, color)))
        .with(tabled::settings::Style::rounded())
        .to_string();
    format!("{head}\n\n{table}")
}

/// Paths are absolute; an empty path means the site root.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".into()
    } else if trimmed.starts_with('/') {
        trimmed.into()
    } else {
        format!("/{trimmed}")
    }
}

fn validate_port(port: u16) -> Result<u16, CliError> {
    if port == 0 {
        return Err(CliError::Validation {
            field: "port".into(),
            reason: "port must be between 1 and 65535".into(),
        });
    }
    Ok(port)
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    fleet: &Fleet,
    args: DomainsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let client = fleet.client();

    match args.command {
        DomainsCommand::List { search } => {
            let domains = client.list_domains().await.map_err(CoreError::from)?;
            let filter = match search {
                Some(q) => ListFilter::new().query(q),
                None => ListFilter::new(),
            };
            let visible: Vec<Domain> = filter.apply(&domains).into_iter().cloned().collect();
            let out = output::render_list(
                &global.output,
                &visible,
                |d| DomainRow::new(d, color),
                |d| d.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainsCommand::Get { id } => {
            let d = client.get_domain(id).await.map_err(CoreError::from)?;
            let out = output::render_single(
                &global.output,
                &d,
                |d| detail(d, color),
                |d| d.domain.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainsCommand::Create { name, agent, ssl } => {
            let agent_id = util::resolve_agent(fleet, &agent).await?;
            let created = client
                .create_domain(&CreateDomainRequest {
                    name: name.trim().to_owned(),
                    agent_id,
                    ssl_enabled: ssl,
                })
                .await
                .map_err(CoreError::from)?;
            output::note(
                global,
                &format!("✓ Domain {} created ({})", created.name, created.id),
            );
            Ok(())
        }

        DomainsCommand::Update {
            id,
            name,
            agent,
            active,
            ssl,
        } => {
            let agent_id = match agent {
                Some(a) => Some(util::resolve_agent(fleet, &a).await?),
                None => None,
            };
            let req = UpdateDomainRequest {
                name,
                agent_id,
                is_active: active,
                ssl_enabled: ssl,
            };
            if req.name.is_none()
                && req.agent_id.is_none()
                && req.is_active.is_none()
                && req.ssl_enabled.is_none()
            {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change; pass --name, --agent, --active or --ssl".into(),
                });
            }
            let updated = client
                .update_domain(id, &req)
                .await
                .map_err(CoreError::from)?;
            output::note(global, &format!("✓ Domain {} updated", updated.name));
            Ok(())
        }

        DomainsCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete domain {id} and all of its routes?"),
                global.yes,
            )? {
                return Ok(());
            }
            client.delete_domain(id).await.map_err(CoreError::from)?;
            output::note(global, &format!("✓ Domain {id} deleted"));
            Ok(())
        }

        DomainsCommand::Status { id } => {
            let status = client.domain_status(id).await.map_err(CoreError::from)?;
            let out = output::render_single(
                &global.output,
                &status,
                |s| status_detail(s, color),
                |s| s.domain_name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainsCommand::Routes(routes) => match routes.command {
            RoutesCommand::List { domain } => {
                let list = client
                    .list_domain_routes(domain)
                    .await
                    .map_err(CoreError::from)?;
                let out = output::render_list(
                    &global.output,
                    &list,
                    |r| RouteRow::new(r, color),
                    |r| r.id.to_string(),
                )?;
                output::print_output(&out, global.quiet);
                Ok(())
            }

            RoutesCommand::Add {
                domain,
                container,
                port,
                path,
            } => {
                let route = client
                    .create_domain_route(&CreateDomainRouteRequest {
                        domain_id: domain,
                        container_name: container.trim().to_owned(),
                        port: validate_port(port)?,
                        path: normalize_path(&path),
                    })
                    .await
                    .map_err(CoreError::from)?;
                output::note(
                    global,
                    &format!(
                        "✓ Route {} -> {}:{} added ({})",
                        route.path, route.container_name, route.port, route.id
                    ),
                );
                Ok(())
            }

            RoutesCommand::Update {
                id,
                container,
                port,
                path,
                active,
            } => {
                let req = UpdateDomainRouteRequest {
                    container_name: container,
                    port: port.map(validate_port).transpose()?,
                    path: path.as_deref().map(normalize_path),
                    is_active: active,
                };
                client
                    .update_domain_route(id, &req)
                    .await
                    .map_err(CoreError::from)?;
                output::note(global, &format!("✓ Route {id} updated"));
                Ok(())
            }

            RoutesCommand::Remove { id } => {
                if !util::confirm(&format!("Remove route {id}?"), global.yes)? {
                    return Ok(());
                }
                client
                    .delete_domain_route(id)
                    .await
                    .map_err(CoreError::from)?;
                output::note(global, &format!("✓ Route {id} removed"));
                Ok(())
            }
        },
    }
}
