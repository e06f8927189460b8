//! login / logout / whoami.

use dialoguer::Input;
use secrecy::SecretString;

use fleetwatch_core::User;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;

fn user_detail(u: &User) -> String {
    output::detail_block(&[
        ("User", u.username.clone()),
        ("Role", u.role.clone()),
        ("Email", output::or_dash(u.email.as_deref())),
        ("ID", u.id.to_string()),
        ("Last login", output::or_dash(u.last_login.map(|t| t.to_rfc3339()))),
    ])
}

pub async fn login(resolved: &Resolved, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let fleet = config::connect(resolved)?;

    let username = match args
        .username
        .or_else(|| resolved.profile.as_ref().and_then(|p| p.username.clone()))
    {
        Some(u) => u,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(|e| CliError::Prompt(e.to_string()))?,
    };

    let stored = resolved
        .profile
        .as_ref()
        .and_then(|p| fleetwatch_config::resolve_password(p, &resolved.name).ok());
    let password = match stored {
        Some(pw) => pw,
        None => SecretString::from(
            rpassword::prompt_password("Password: ").map_err(|e| CliError::Prompt(e.to_string()))?,
        ),
    };

    let user = fleet.session().login(&username, &password).await?;
    output::note(
        global,
        &format!("✓ Logged in as {} ({}) on profile '{}'", user.username, user.role, resolved.name),
    );
    Ok(())
}

pub fn logout(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let fleet = config::connect(resolved)?;
    fleet.session().logout()?;
    output::note(global, &format!("✓ Logged out of profile '{}'", resolved.name));
    Ok(())
}

pub fn whoami(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let fleet = config::connect_authenticated(resolved)?;
    let user = fleet.session().current_user().ok_or_else(|| CliError::NotLoggedIn {
        profile: resolved.name.clone(),
    })?;
    let out = output::render_single(&global.output, &user, user_detail, |u| u.username.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
