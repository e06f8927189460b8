//! Image command handlers.
//!
//! Pull and remove go through the action queue: the command returns once
//! the agent has the job, not when Docker is done.

use tabled::Tabled;

use fleetwatch_core::format::format_byte_count;
use fleetwatch_core::{
    ActionCommand, CoreError, Fleet, Image, ImageQuery, PullImage, RemoveImage,
};

use crate::cli::{GlobalOpts, ImagesArgs, ImagesCommand};
use crate::error::CliError;
use crate::output;

use super::{actions, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Arch")]
    arch: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Image> for ImageRow {
    fn from(i: &Image) -> Self {
        Self {
            id: i.id.to_string(),
            tags: display_tags(i),
            agent: output::or_dash(i.agent_name.as_deref()),
            size: format_byte_count(i.size),
            arch: i.architecture.clone(),
            created: i.created.format("%Y-%m-%d").to_string(),
        }
    }
}

fn display_tags(i: &Image) -> String {
    if i.tags.is_empty() {
        "<none>".into()
    } else {
        i.tags.join(", ")
    }
}

/// Image table shared with `agents images`.
pub fn render(list: &[Image], global: &GlobalOpts) -> Result<String, CliError> {
    output::render_list(
        &global.output,
        list,
        |i| ImageRow::from(i),
        |i| i.id.to_string(),
    )
}

fn detail(i: &Image) -> String {
    output::detail_block(&[
        ("ID", i.id.to_string()),
        ("Docker ID", i.image_id.clone()),
        ("Tags", display_tags(i)),
        ("Size", format_byte_count(i.size)),
        ("Arch", i.architecture.clone()),
        ("Created", i.created.to_rfc3339()),
        (
            "Agent",
            match (&i.agent_name, i.agent_id) {
                (Some(name), Some(id)) => format!("{name} ({id})"),
                (None, Some(id)) => id.to_string(),
                (name, None) => output::or_dash(name.as_deref()),
            },
        ),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(fleet: &Fleet, args: ImagesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ImagesCommand::List {
            agent,
            search,
            watch,
        } => {
            let agent_id = match agent {
                Some(a) => Some(util::resolve_agent(fleet, &a).await?),
                None => None,
            };
            let query = ImageQuery { agent_id, search };

            if watch.watch {
                let handle = fleet.images_poller(query);
                return util::watch_poller(fleet, handle, global, |list| render(list, global))
                    .await;
            }

            let list = fleet
                .client()
                .list_images(&query)
                .await
                .map_err(CoreError::from)?;
            let out = render(&list, global)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ImagesCommand::Get { id } => {
            let image = fleet
                .client()
                .get_image(id)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_single(&global.output, &image, detail, |i| i.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ImagesCommand::Pull { agent, image, tag } => {
            let agent_id = util::resolve_agent(fleet, &agent).await?;
            let command = ActionCommand::PullImage(PullImage { image, tag });
            let action = fleet
                .action_submitter()
                .submit_command(agent_id, &command)
                .await?;
            actions::print_queued(&action, global)
        }

        ImagesCommand::Remove {
            agent,
            image_id,
            force,
        } => {
            let agent_id = util::resolve_agent(fleet, &agent).await?;
            if !util::confirm(&format!("Remove image {image_id} from {agent}?"), global.yes)? {
                return Ok(());
            }
            let command = ActionCommand::RemoveImage(RemoveImage {
                image_id,
                force: force.then_some(true),
            });
            let action = fleet
                .action_submitter()
                .submit_command(agent_id, &command)
                .await?;
            actions::print_queued(&action, global)
        }
    }
}
