// ── Runtime configuration ──
//
// Describes *where* the backend lives and how often views refresh.
// Never touches disk: the CLI builds a `FleetConfig` from its profile
// and hands it in.

use std::time::Duration;

use url::Url;

use fleetwatch_api::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single backend.
///
/// The intervals are the refresh cadences observed to work well for an
/// operator console. None of them is a backend contract.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Backend URL (e.g., `https://monitor.example.com`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Agent list refresh (liveness view).
    pub agents_interval: Duration,
    /// Dashboard refresh.
    pub dashboard_interval: Duration,
    /// Single-agent and other detail views.
    pub detail_interval: Duration,
    /// Action history refresh.
    pub actions_interval: Duration,
    /// Quiet period before a filter-driven refetch.
    pub filter_debounce: Duration,
    /// Heartbeat age after which the backend reports an agent offline.
    /// Display-only; the client never derives status itself.
    pub offline_threshold: Duration,
}

impl FleetConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            agents_interval: Duration::from_secs(5),
            dashboard_interval: Duration::from_secs(30),
            detail_interval: Duration::from_secs(30),
            actions_interval: Duration::from_secs(5),
            filter_debounce: Duration::from_millis(500),
            offline_threshold: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
