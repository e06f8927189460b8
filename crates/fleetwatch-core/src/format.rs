//! Human-readable formatting for metrics and statuses.
//!
//! Pure functions shared by every renderer; nothing here knows about
//! terminals or colors, only which [`StatusTone`] a status belongs to.

use std::time::Duration;

use chrono::{DateTime, Utc};

use fleetwatch_api::{ActionStatus, AgentStatus};

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 units: `0 Bytes`, `1.5 KB`, `2 GB`.
///
/// Rounds to two decimals and drops trailing zeros. Saturates at TB.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", BYTE_UNITS[unit])
}

/// Signed counters from the backend; negatives render as zero.
pub fn format_byte_count(bytes: i64) -> String {
    format_bytes(u64::try_from(bytes).unwrap_or(0))
}

/// CPU usage reported as a fraction (`0.123` → `12.3%`).
pub fn format_cpu_usage(fraction: f64) -> String {
    format_percent(fraction * 100.0)
}

/// A value already in percent (`42.04` → `42.0%`).
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.1}%")
}

pub fn format_megabytes(mb: f64) -> String {
    format!("{mb:.1} MB")
}

/// Relative age of `then` as seen from `now`: `just now`, `42s ago`,
/// `1h 2m 5s ago`. Future timestamps count as `just now`.
pub fn format_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = u64::try_from((now - then).num_seconds()).unwrap_or(0);
    if secs == 0 {
        return "just now".to_owned();
    }
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}

/// Semantic color class for a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Good,
    Bad,
    Warning,
    Info,
    Neutral,
}

/// Docker reports free-form statuses (`running`, `Up 3 hours (Paused)`,
/// `Exited (0) 2 days ago`), so matching is by keyword.
pub fn container_status_tone(status: &str) -> StatusTone {
    let status = status.trim().to_ascii_lowercase();
    if status.contains("paused") {
        StatusTone::Warning
    } else if status.starts_with("restarting") {
        StatusTone::Info
    } else if status == "running" || status.starts_with("up") {
        StatusTone::Good
    } else if ["exited", "stopped", "dead"]
        .iter()
        .any(|s| status.starts_with(s))
    {
        StatusTone::Bad
    } else {
        StatusTone::Neutral
    }
}

pub fn agent_status_tone(status: AgentStatus) -> StatusTone {
    match status {
        AgentStatus::Online => StatusTone::Good,
        AgentStatus::Offline => StatusTone::Bad,
        AgentStatus::Unknown => StatusTone::Neutral,
    }
}

pub fn action_status_tone(status: ActionStatus) -> StatusTone {
    match status {
        ActionStatus::Completed => StatusTone::Good,
        ActionStatus::Failed => StatusTone::Bad,
        ActionStatus::Pending => StatusTone::Info,
        ActionStatus::Unknown => StatusTone::Neutral,
    }
}
