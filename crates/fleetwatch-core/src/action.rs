// ── Action submission ──
//
// Operators describe a command as loose `key=value` fields; this module
// turns them into one variant of a closed command union, fully validated
// and parsed, before a single byte goes over the network. The backend only
// ever sees a payload whose shape matches its `type`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use fleetwatch_api::{Action, ActionType, ApiClient, CreateActionRequest};

use crate::error::CoreError;
use crate::poller::RefreshTrigger;

/// Raw operator input: field name to text value.
pub type RawFields = BTreeMap<String, String>;

// ── Field table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Non-negative integer.
    Integer,
    /// `true`/`false` (also `yes`/`no`, `1`/`0`).
    Flag,
    /// JSON object of string values, e.g. `{"8080":"80"}`.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Present whenever the key is given, even with an empty value.
    pub allow_blank: bool,
    pub help: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, required: bool, help: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
        allow_blank: false,
        help,
    }
}

impl FieldSpec {
    const fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    fn is_present(&self, raw: &RawFields) -> bool {
        if self.allow_blank {
            raw.contains_key(self.name)
        } else {
            text(raw, self.name).is_some()
        }
    }
}

const START_CONTAINER: &[FieldSpec] = &[
    field("image", FieldKind::Text, true, "image reference, e.g. nginx:1.27"),
    field("name", FieldKind::Text, true, "container name"),
    field("ports", FieldKind::Json, false, r#"host-to-container ports, {"8080":"80"}"#),
    field("environment", FieldKind::Json, false, r#"environment, {"KEY":"value"}"#),
    field("volumes", FieldKind::Json, false, r#"bind mounts, {"/host":"/container"}"#),
    field("domain", FieldKind::Text, false, "domain to route to the container"),
];
const STOP_CONTAINER: &[FieldSpec] = &[
    field("container_id", FieldKind::Text, true, "docker container id or name"),
    field("timeout", FieldKind::Integer, false, "seconds to wait before killing (default 10)"),
];
const REMOVE_CONTAINER: &[FieldSpec] = &[
    field("container_id", FieldKind::Text, true, "docker container id or name"),
    field("force", FieldKind::Flag, false, "remove even if running"),
];
const REMOVE_IMAGE: &[FieldSpec] = &[
    field("image_id", FieldKind::Text, true, "image id or reference"),
    field("force", FieldKind::Flag, false, "remove even if in use"),
];
const WRITE_FILE: &[FieldSpec] = &[
    field("path", FieldKind::Text, true, "absolute path on the agent host"),
    field("content", FieldKind::Text, true, "file contents, may be empty").allow_blank(),
    field("mode", FieldKind::Integer, false, "file mode (default 644)"),
];
const PULL_IMAGE: &[FieldSpec] = &[
    field("image", FieldKind::Text, true, "image repository, e.g. nginx"),
    field("tag", FieldKind::Text, false, "tag (default latest)"),
];

/// Static per-type field table.
pub fn action_fields(kind: ActionType) -> &'static [FieldSpec] {
    match kind {
        ActionType::StartContainer => START_CONTAINER,
        ActionType::StopContainer => STOP_CONTAINER,
        ActionType::RemoveContainer => REMOVE_CONTAINER,
        ActionType::RemoveImage => REMOVE_IMAGE,
        ActionType::RestartNginx => &[],
        ActionType::WriteFile => WRITE_FILE,
        ActionType::PullImage => PULL_IMAGE,
    }
}

// ── Typed payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartContainer {
    pub image: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopContainer {
    pub container_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveContainer {
    pub container_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveImage {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFile {
    pub path: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullImage {
    pub image: String,
    pub tag: String,
}

/// A fully-typed remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCommand {
    StartContainer(StartContainer),
    StopContainer(StopContainer),
    RemoveContainer(RemoveContainer),
    RemoveImage(RemoveImage),
    RestartNginx,
    WriteFile(WriteFile),
    PullImage(PullImage),
}

impl ActionCommand {
    pub fn kind(&self) -> ActionType {
        match self {
            Self::StartContainer(_) => ActionType::StartContainer,
            Self::StopContainer(_) => ActionType::StopContainer,
            Self::RemoveContainer(_) => ActionType::RemoveContainer,
            Self::RemoveImage(_) => ActionType::RemoveImage,
            Self::RestartNginx => ActionType::RestartNginx,
            Self::WriteFile(_) => ActionType::WriteFile,
            Self::PullImage(_) => ActionType::PullImage,
        }
    }

    /// Build a command from raw operator input.
    ///
    /// Checks run in a fixed order and stop at the first problem:
    /// unknown field names, then required presence (blank counts as
    /// missing unless the field allows it), then parsing of JSON,
    /// integer, and flag fields.
    pub fn from_fields(kind: ActionType, raw: &RawFields) -> Result<Self, CoreError> {
        let specs = action_fields(kind);

        if let Some(unknown) = raw.keys().find(|k| !specs.iter().any(|s| s.name == k.as_str())) {
            let expected = specs.iter().map(|s| s.name).collect::<Vec<_>>();
            return Err(CoreError::Validation {
                field: unknown.clone(),
                reason: if expected.is_empty() {
                    format!("{kind} takes no fields")
                } else {
                    format!("not a field of {kind} (expected one of: {})", expected.join(", "))
                },
            });
        }

        if let Some(missing) = specs
            .iter()
            .find(|s| s.required && !s.is_present(raw))
        {
            return Err(CoreError::MissingField {
                field: missing.name.to_owned(),
                action: kind,
            });
        }

        let fields = Fields { raw };
        Ok(match kind {
            ActionType::StartContainer => {
                let ports = fields.json_map("ports")?;
                let environment = fields.json_map("environment")?;
                let volumes = fields.json_map("volumes")?;
                Self::StartContainer(StartContainer {
                    image: fields.required("image"),
                    name: fields.required("name"),
                    ports,
                    environment,
                    volumes,
                    domain: fields.text("domain"),
                })
            }
            ActionType::StopContainer => Self::StopContainer(StopContainer {
                container_id: fields.required("container_id"),
                timeout: fields.integer("timeout")?,
            }),
            ActionType::RemoveContainer => Self::RemoveContainer(RemoveContainer {
                container_id: fields.required("container_id"),
                force: fields.flag("force")?,
            }),
            ActionType::RemoveImage => Self::RemoveImage(RemoveImage {
                image_id: fields.required("image_id"),
                force: fields.flag("force")?,
            }),
            ActionType::RestartNginx => Self::RestartNginx,
            ActionType::WriteFile => Self::WriteFile(WriteFile {
                path: fields.required("path"),
                content: raw.get("content").cloned().unwrap_or_default(),
                mode: fields.integer("mode")?,
            }),
            ActionType::PullImage => Self::PullImage(PullImage {
                image: fields.required("image"),
                tag: fields.text("tag").unwrap_or_else(|| "latest".into()),
            }),
        })
    }

    /// The JSON `payload` for this command.
    pub fn payload(&self) -> Result<serde_json::Value, CoreError> {
        let value = match self {
            Self::StartContainer(p) => serde_json::to_value(p),
            Self::StopContainer(p) => serde_json::to_value(p),
            Self::RemoveContainer(p) => serde_json::to_value(p),
            Self::RemoveImage(p) => serde_json::to_value(p),
            Self::RestartNginx => Ok(serde_json::Value::Object(serde_json::Map::new())),
            Self::WriteFile(p) => serde_json::to_value(p),
            Self::PullImage(p) => serde_json::to_value(p),
        };
        value.map_err(|e| CoreError::Internal(format!("failed to encode payload: {e}")))
    }

    pub fn to_request(&self, agent_id: Uuid) -> Result<CreateActionRequest, CoreError> {
        Ok(CreateActionRequest {
            agent_id,
            action_type: self.kind(),
            payload: self.payload()?,
        })
    }
}

/// Trimmed, non-blank value of a raw field.
fn text<'a>(raw: &'a RawFields, name: &str) -> Option<&'a str> {
    raw.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

struct Fields<'a> {
    raw: &'a RawFields,
}

impl Fields<'_> {
    /// Presence was checked up front.
    fn required(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    fn text(&self, name: &str) -> Option<String> {
        text(self.raw, name).map(str::to_owned)
    }

    fn json_map(&self, name: &str) -> Result<Option<BTreeMap<String, String>>, CoreError> {
        text(self.raw, name)
            .map(|value| {
                serde_json::from_str(value).map_err(|e| CoreError::PayloadFormat {
                    field: name.to_owned(),
                    reason: format!("expected a JSON object of strings: {e}"),
                })
            })
            .transpose()
    }

    fn integer(&self, name: &str) -> Result<Option<u32>, CoreError> {
        text(self.raw, name)
            .map(|value| {
                value.parse().map_err(|e| CoreError::PayloadFormat {
                    field: name.to_owned(),
                    reason: format!("expected a non-negative integer: {e}"),
                })
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<Option<bool>, CoreError> {
        text(self.raw, name)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" => Ok(false),
                _ => Err(CoreError::PayloadFormat {
                    field: name.to_owned(),
                    reason: format!("expected true or false, got '{value}'"),
                }),
            })
            .transpose()
    }
}

// ── Submitter ────────────────────────────────────────────────────────

/// Validates and queues actions against an agent.
///
/// Does not follow an action to completion: attach the action-list
/// poller's trigger and the `pending -> completed|failed` transition shows
/// up on its next fetch.
pub struct ActionSubmitter {
    client: Arc<ApiClient>,
    on_submitted: Option<RefreshTrigger>,
}

impl ActionSubmitter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            on_submitted: None,
        }
    }

    /// Fire `trigger` after every successful submission.
    pub fn with_refresh(mut self, trigger: RefreshTrigger) -> Self {
        self.on_submitted = Some(trigger);
        self
    }

    /// Validate raw fields, then submit. Validation failures never touch
    /// the network.
    pub async fn submit(
        &self,
        agent_id: Uuid,
        kind: ActionType,
        raw: &RawFields,
    ) -> Result<Action, CoreError> {
        let command = ActionCommand::from_fields(kind, raw)?;
        self.submit_command(agent_id, &command).await
    }

    /// Submit an already-typed command: exactly one `POST /api/actions`.
    pub async fn submit_command(
        &self,
        agent_id: Uuid,
        command: &ActionCommand,
    ) -> Result<Action, CoreError> {
        let request = command.to_request(agent_id)?;
        debug!(%agent_id, action = %request.action_type, "submitting action");

        let action = self
            .client
            .create_action(&request)
            .await
            .map_err(submission_error)?;

        info!(action_id = %action.id, %agent_id, action = %request.action_type, "action queued");
        if let Some(trigger) = &self.on_submitted {
            trigger.fire();
        }
        Ok(action)
    }
}

/// Keep auth, network and conflict failures recognizable; everything
/// else collapses into one submission error.
fn submission_error(err: fleetwatch_api::Error) -> CoreError {
    match CoreError::from(err) {
        e @ (CoreError::Auth { .. }
        | CoreError::Network { .. }
        | CoreError::Timeout { .. }
        | CoreError::Conflict { .. }) => e,
        other => CoreError::SubmissionFailed {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn every_type_has_a_field_table_with_unique_names() {
        for kind in ActionType::iter() {
            let specs = action_fields(kind);
            let mut names: Vec<_> = specs.iter().map(|s| s.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), specs.len(), "{kind}");
        }
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = ActionCommand::from_fields(ActionType::StopContainer, &RawFields::new())
            .unwrap_err();
        match err {
            CoreError::MissingField { field, action } => {
                assert_eq!(field, "container_id");
                assert_eq!(action, ActionType::StopContainer);
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let err = ActionCommand::from_fields(
            ActionType::WriteFile,
            &raw(&[("path", "   "), ("content", "motd")]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { ref field, .. } if field == "path"));
    }

    #[test]
    fn write_file_accepts_empty_content() {
        let cmd = ActionCommand::from_fields(
            ActionType::WriteFile,
            &raw(&[("path", "/tmp/x"), ("content", "")]),
        )
        .unwrap();
        assert_eq!(cmd.payload().unwrap(), json!({ "path": "/tmp/x", "content": "" }));

        let err = ActionCommand::from_fields(ActionType::WriteFile, &raw(&[("path", "/tmp/x")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { ref field, .. } if field == "content"));
    }

    #[test]
    fn missing_fields_win_over_malformed_json() {
        let err = ActionCommand::from_fields(
            ActionType::StartContainer,
            &raw(&[("image", "nginx"), ("ports", "{not json")]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { ref field, .. } if field == "name"));
    }

    #[test]
    fn malformed_json_field_is_payload_format_error() {
        let err = ActionCommand::from_fields(
            ActionType::StartContainer,
            &raw(&[("image", "nginx"), ("name", "web"), ("environment", "{\"A\": 1}")]),
        )
        .unwrap_err();
        match err {
            CoreError::PayloadFormat { field, .. } => assert_eq!(field, "environment"),
            other => panic!("expected PayloadFormat, got {other:?}"),
        }
    }

    #[test]
    fn bad_integer_and_flag_are_payload_format_errors() {
        let err = ActionCommand::from_fields(
            ActionType::StopContainer,
            &raw(&[("container_id", "abc"), ("timeout", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PayloadFormat { ref field, .. } if field == "timeout"));

        let err = ActionCommand::from_fields(
            ActionType::RemoveImage,
            &raw(&[("image_id", "sha256:1"), ("force", "maybe")]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::PayloadFormat { ref field, .. } if field == "force"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = ActionCommand::from_fields(ActionType::RestartNginx, &raw(&[("now", "yes")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "now"));
    }

    #[test]
    fn payloads_omit_absent_optionals() {
        let cmd = ActionCommand::from_fields(
            ActionType::WriteFile,
            &raw(&[("path", "/tmp/x"), ("content", "hi")]),
        )
        .unwrap();
        assert_eq!(cmd.payload().unwrap(), json!({ "path": "/tmp/x", "content": "hi" }));

        assert_eq!(ActionCommand::RestartNginx.payload().unwrap(), json!({}));

        let cmd = ActionCommand::from_fields(ActionType::PullImage, &raw(&[("image", "redis")]))
            .unwrap();
        assert_eq!(cmd.payload().unwrap(), json!({ "image": "redis", "tag": "latest" }));
    }

    #[test]
    fn start_container_parses_structured_fields() {
        let cmd = ActionCommand::from_fields(
            ActionType::StartContainer,
            &raw(&[
                ("image", "nginx:1.27"),
                ("name", "web"),
                ("ports", r#"{"8080":"80"}"#),
                ("domain", "example.com"),
            ]),
        )
        .unwrap();
        assert_eq!(
            cmd.payload().unwrap(),
            json!({
                "image": "nginx:1.27",
                "name": "web",
                "ports": { "8080": "80" },
                "domain": "example.com"
            })
        );
    }
}
