//! Client-side state between `fleetwatch-api` and the operator console.
//!
//! - **[`Session`]**: Who is logged in. Persists the bearer token and
//!   user record through a [`CredentialStore`], restores them without a
//!   round trip, and drops both the moment any endpoint answers 401.
//!
//! - **[`ResourcePoller`]**: Keeps one view of backend state fresh:
//!   immediate fetch, fixed-interval refetch, manual refresh through a
//!   [`RefreshTrigger`], debounced parameter changes. Failures keep the
//!   last good snapshot. Stopping (or dropping the [`PollerHandle`])
//!   guarantees no later state change.
//!
//! - **[`ActionSubmitter`]**: Validates raw operator input against the
//!   per-type field table into a typed [`ActionCommand`], then queues it
//!   with a single `POST /api/actions`. Bad input never reaches the wire.
//!
//! - **[`ListFilter`]**: Text search plus exact-match facets over an
//!   already-fetched list, order preserving.
//!
//! - **[`Fleet`]**: Facade wiring the client, session and pollers from a
//!   [`FleetConfig`].

pub mod action;
pub mod config;
pub mod error;
pub mod filter;
pub mod fleet;
pub mod format;
pub mod poller;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{
    ActionCommand, ActionSubmitter, FieldKind, FieldSpec, PullImage, RawFields, RemoveContainer,
    RemoveImage, StartContainer, StopContainer, WriteFile, action_fields,
};
pub use config::{FleetConfig, TlsVerification};
pub use error::CoreError;
pub use filter::{Facet, Filterable, ListFilter, Selection};
pub use fleet::Fleet;
pub use format::StatusTone;
pub use poller::{PollState, PollerHandle, RefreshTrigger, ResourcePoller};
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, SessionState,
};

// Wire types consumers handle directly.
pub use fleetwatch_api as api;
pub use fleetwatch_api::{
    Action, ActionQuery, ActionStatus, ActionType, Agent, AgentDetail, AgentStatus, ApiClient,
    Container, ContainerDetail, ContainerQuery, DashboardData, Domain, DomainDetail, Image,
    ImageQuery, User,
};
