//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod actions;
pub mod agents;
pub mod config_cmd;
pub mod containers;
pub mod dashboard;
pub mod domains;
pub mod images;
pub mod notifications;
pub mod session;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Session commands manage the login themselves.
    match cmd {
        Command::Login(args) => return session::login(resolved, args, global).await,
        Command::Logout => return session::logout(resolved, global),
        Command::Whoami => return session::whoami(resolved, global),
        _ => {}
    }

    let fleet = config::connect_authenticated(resolved)?;
    match cmd {
        Command::Agents(args) => agents::handle(&fleet, args, global).await,
        Command::Containers(args) => containers::handle(&fleet, args, global).await,
        Command::Images(args) => images::handle(&fleet, args, global).await,
        Command::Actions(args) => actions::handle(&fleet, args, global).await,
        Command::Dashboard(args) => dashboard::handle(&fleet, args, global).await,
        Command::Notifications(args) => notifications::handle(&fleet, args, global).await,
        Command::Domains(args) => domains::handle(&fleet, args, global).await,
        Command::Login(_)
        | Command::Logout
        | Command::Whoami
        | Command::Config(_)
        | Command::Completions(_) => Err(CliError::Internal(
            "command dispatched to the wrong handler".into(),
        )),
    }
}
