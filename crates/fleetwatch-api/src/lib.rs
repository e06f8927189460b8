// fleetwatch-api: Async Rust client for the fleet monitoring backend REST API

pub mod actions;
pub mod agents;
pub mod auth;
pub mod client;
pub mod containers;
pub mod dashboard;
pub mod domains;
pub mod error;
pub mod images;
pub mod models;
pub mod notifications;
pub mod transport;

pub use auth::AuthObserver;
pub use client::ApiClient;
pub use error::Error;
pub use models::*;
pub use transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};
