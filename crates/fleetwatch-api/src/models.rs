// Wire types for the monitoring backend.
//
// Field names follow the backend JSON exactly. The backend is written in
// a language that serializes empty slices as `null`, so every list field
// goes through `null_as_default`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Decode `null` (or a missing field, with `#[serde(default)]`) as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ports travel as JSON strings (`"8080"`); older rows carry numbers.
pub(crate) mod port_string {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u16),
        Text(String),
    }

    pub fn serialize<S: Serializer>(port: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(port)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(t) => t
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid port '{t}'"))),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize_option<S: Serializer>(
        port: &Option<u16>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match port {
            Some(p) => serializer.collect_str(p),
            None => serializer.serialize_none(),
        }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// ── Agents ───────────────────────────────────────────────────────────

/// Liveness as reported by the backend (derived from heartbeat staleness).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentStatus {
    Online,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    /// Enrollment token the agent daemon authenticates with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAgentRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateAgentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub memory_total: i64,
    pub memory_used: i64,
    pub disk_usage: f64,
    pub disk_total: i64,
    pub disk_used: i64,
    pub network_rx: i64,
    pub network_tx: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetric {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub disk_usage: f64,
    #[serde(default)]
    pub network_rx: i64,
    #[serde(default)]
    pub network_tx: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDetail {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub mountpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDetail {
    #[serde(alias = "network_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

/// `GET /api/agents/{id}`: the agent plus everything it reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub agent: Agent,
    #[serde(default)]
    pub metrics: AgentMetrics,
    #[serde(default, deserialize_with = "null_as_default")]
    pub containers: Vec<Container>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volumes: Vec<VolumeDetail>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub networks: Vec<NetworkDetail>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_metrics: Vec<SystemMetric>,
}

/// Rendered reverse-proxy configuration for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NginxConfig {
    pub domain: String,
    #[serde(default)]
    pub agent_ip: String,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<NginxRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NginxRoute {
    pub path: String,
    pub container_name: String,
    #[serde(with = "port_string")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNginxConfig {
    pub agent_id: Uuid,
    #[serde(rename = "domains", default, deserialize_with = "null_as_default")]
    pub configs: Vec<NginxConfig>,
}

// ── Containers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_id: Option<Uuid>,
    pub container_id: String,
    pub name: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub restart_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_sent_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_received_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerLog {
    pub id: Uuid,
    pub container_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub log_line: String,
    #[serde(default)]
    pub stream: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetric {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cpu_usage_percent: f64,
    #[serde(default)]
    pub memory_usage_mb: f64,
    #[serde(default)]
    pub network_sent_bytes: i64,
    #[serde(default)]
    pub network_received_bytes: i64,
}

/// `GET /api/containers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDetail {
    #[serde(flatten)]
    pub container: Container,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<ContainerLog>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<ContainerMetric>,
}

/// Server-side filters for `GET /api/containers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerQuery {
    pub agent_id: Option<Uuid>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ContainerQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(agent_id) = self.agent_id {
            params.push(("agent_id", agent_id.to_string()));
        }
        push_non_empty(&mut params, "status", self.status.as_deref());
        push_non_empty(&mut params, "search", self.search.as_deref());
        params
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub containers: Vec<Container>,
}

// ── Images ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_id: Option<Uuid>,
    pub image_id: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub architecture: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    pub agent_id: Option<Uuid>,
    pub search: Option<String>,
}

impl ImageQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(agent_id) = self.agent_id {
            params.push(("agent_id", agent_id.to_string()));
        }
        push_non_empty(&mut params, "search", self.search.as_deref());
        params
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
}

// ── Actions ──────────────────────────────────────────────────────────

/// Imperative commands an agent knows how to execute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    StartContainer,
    StopContainer,
    RemoveContainer,
    RemoveImage,
    RestartNginx,
    WriteFile,
    PullImage,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ActionStatus {
    /// `true` once the agent has reported an outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A submitted action as recorded by the backend.
///
/// `action_type` stays a string: the backend also records internal
/// action kinds that operators cannot submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub agent_id: Uuid,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub status: ActionStatus,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Action {
    /// The submittable kind, if this is one.
    pub fn kind(&self) -> Option<ActionType> {
        self.action_type.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateActionRequest {
    pub agent_id: Uuid,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionQuery {
    pub agent_id: Option<Uuid>,
    pub action_type: Option<String>,
    pub status: Option<String>,
}

impl ActionQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(agent_id) = self.agent_id {
            params.push(("agent_id", agent_id.to_string()));
        }
        push_non_empty(&mut params, "type", self.action_type.as_deref());
        push_non_empty(&mut params, "status", self.status.as_deref());
        params
    }
}

/// The list endpoint has shipped both a wrapped and a bare-array body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ActionListResponse {
    Wrapped {
        #[serde(default, deserialize_with = "null_as_default")]
        actions: Vec<Action>,
    },
    Bare(Vec<Action>),
}

impl ActionListResponse {
    pub(crate) fn into_actions(self) -> Vec<Action> {
        match self {
            Self::Wrapped { actions } | Self::Bare(actions) => actions,
        }
    }
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiMetrics {
    pub total_agents: i64,
    pub online_agents: i64,
    pub total_containers: i64,
    pub running_containers: i64,
    pub total_images: i64,
    pub total_volumes: i64,
    pub total_networks: i64,
    pub avg_cpu_usage: f64,
    pub avg_memory_usage: f64,
    pub total_network_rx: i64,
    pub total_network_tx: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub disk_usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub rx_bytes: i64,
    #[serde(default)]
    pub tx_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub container_id: String,
    pub name: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping: Option<DateTime<Utc>>,
    #[serde(default)]
    pub container_count: i64,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
}

/// `GET /api/dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub kpis: KpiMetrics,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_usage: Vec<ResourcePoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_activity: Vec<NetworkPoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_containers_cpu: Vec<ContainerUsage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_containers_memory: Vec<ContainerUsage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agents_summary: Vec<AgentSummary>,
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub email_settings: EmailSettings,
    pub notifications: NotificationRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    /// Comma-separated recipient list.
    pub to_emails: String,
    pub use_tls: bool,
    pub use_start_tls: bool,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            from_name: String::new(),
            to_emails: String::new(),
            use_tls: false,
            use_start_tls: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationRules {
    pub agent_offline: ToggleRule,
    pub container_stopped: ToggleRule,
    pub cpu_threshold: ThresholdRule,
    pub ram_threshold: ThresholdRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleRule {
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRule {
    pub enabled: bool,
    /// Percentage, 0-100.
    pub threshold: f64,
    pub message: String,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 80.0,
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ── Domains ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
    pub agent_id: Uuid,
    #[serde(default)]
    pub agent_ip: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub ssl_enabled: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRoute {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub container_name: String,
    #[serde(with = "port_string")]
    pub port: u16,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_active: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDetail {
    #[serde(flatten)]
    pub domain: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<DomainRoute>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDomainRequest {
    pub name: String,
    pub agent_id: Uuid,
    pub ssl_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateDomainRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDomainRouteRequest {
    pub domain_id: Uuid,
    pub container_name: String,
    #[serde(with = "port_string")]
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateDomainRouteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "port_string::serialize_option"
    )]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Per-route view of `GET /api/domains/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStatus {
    pub route_id: Uuid,
    pub container_name: String,
    #[serde(with = "port_string")]
    pub port: u16,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_active: bool,
    /// Docker status of the routed container, `not_found` when the agent
    /// does not report one by that name.
    #[serde(default)]
    pub container_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub domain_id: Uuid,
    pub domain_name: String,
    pub agent_id: Uuid,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub agent_ip: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<RouteStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub domains: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainRouteListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<DomainRoute>,
}

fn push_non_empty(params: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        params.push((key, value.to_owned()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn agent_status_falls_back_to_unknown() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
            "name": "edge-1",
            "is_active": true,
            "created": "2025-01-04T10:00:00Z",
            "status": "degraded"
        }))
        .unwrap();
        assert_eq!(agent.status, AgentStatus::Unknown);
        assert!(agent.last_ping.is_none());
    }

    #[test]
    fn null_lists_decode_empty() {
        let dash: DashboardData = serde_json::from_value(json!({
            "kpis": { "total_agents": 2, "online_agents": 1 },
            "resource_usage": null,
            "agents_summary": null
        }))
        .unwrap();
        assert_eq!(dash.kpis.total_agents, 2);
        assert!(dash.resource_usage.is_empty());
        assert!(dash.agents_summary.is_empty());
    }

    #[test]
    fn action_list_accepts_both_shapes() {
        let wrapped: ActionListResponse =
            serde_json::from_value(json!({ "actions": null, "total": 0 })).unwrap();
        assert!(wrapped.into_actions().is_empty());

        let bare: ActionListResponse = serde_json::from_value(json!([{
            "id": "0b6a1c1d-1111-4d5e-8a4e-1c2d3e4f5a6b",
            "agent_id": "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
            "type": "restart_nginx",
            "payload": null,
            "status": "pending",
            "created": "2025-01-04T10:00:00Z"
        }]))
        .unwrap();
        let actions = bare.into_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind(), Some(ActionType::RestartNginx));
        assert!(actions[0].payload.is_empty());
    }

    #[test]
    fn route_ports_travel_as_strings() {
        let status: DomainStatus = serde_json::from_value(json!({
            "domain_id": "0b6a1c1d-1111-4d5e-8a4e-1c2d3e4f5a6b",
            "domain_name": "app.example.com",
            "agent_id": "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
            "agent_name": "edge-1",
            "agent_ip": "203.0.113.7",
            "is_active": true,
            "ssl_enabled": false,
            "routes": [{
                "route_id": "7a0e2b4c-2222-4d5e-8a4e-1c2d3e4f5a6b",
                "container_name": "web",
                "port": "3000",
                "path": "/",
                "is_active": true,
                "container_status": "not_found"
            }]
        }))
        .unwrap();
        assert_eq!(status.routes[0].port, 3000);
        assert_eq!(status.routes[0].container_status, "not_found");

        let req = UpdateDomainRouteRequest {
            port: Some(8080),
            ..UpdateDomainRouteRequest::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "port": "8080" }));
        assert!(serde_json::from_value::<NginxRoute>(json!({
            "path": "/", "container_name": "web", "port": "http"
        }))
        .is_err());
    }

    #[test]
    fn nginx_config_reads_domains_key() {
        let cfg: AgentNginxConfig = serde_json::from_value(json!({
            "agent_id": "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
            "domains": [{
                "domain": "app.example.com",
                "agent_ip": "203.0.113.7",
                "ssl_enabled": true,
                "routes": [{ "path": "/api", "container_name": "api", "port": "8080" }]
            }]
        }))
        .unwrap();
        assert_eq!(cfg.configs.len(), 1);
        assert_eq!(cfg.configs[0].routes[0].port, 8080);
    }

    #[test]
    fn query_params_skip_blank_values() {
        let query = ContainerQuery {
            agent_id: None,
            status: Some("  ".into()),
            search: Some("nginx".into()),
        };
        assert_eq!(query.to_params(), vec![("search", "nginx".to_owned())]);
    }
}
