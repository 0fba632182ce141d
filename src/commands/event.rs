use poise::serenity_prelude as serenity;
use tracing::info;

use super::template::autocomplete_template_name;
use crate::error::ActionError;
use crate::interactions::render::render_event;
use crate::models::Event;
use crate::{Context, Error};

const DEFAULT_DESCRIPTION: &str = "No description.";

/// Create a new PT event with sign-up buttons
#[poise::command(slash_command, guild_only)]
pub async fn create_event(
    ctx: Context<'_>,
    #[description = "Event title"]
    #[max_length = 100]
    title: String,
    #[description = "When the event starts, e.g. 21:00 UTC"]
    #[max_length = 100]
    time: String,
    #[description = "Extra details for the party"]
    #[max_length = 1000]
    description: Option<String>,
    #[description = "Template to seed the slots from"]
    #[autocomplete = "autocomplete_template_name"]
    template: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id();

    let roles = match (&template, guild_id) {
        (Some(name), Some(guild)) => {
            let found = ctx.data().templates.get(guild, name).await?;
            found
                .ok_or_else(|| ActionError::not_found(format!("Template '{}'", name)))?
                .roles
        }
        _ => Vec::new(),
    };

    let description = description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let event = Event::new(
        &title,
        &time,
        &description,
        ctx.author().id,
        ctx.author().display_name(),
        guild_id,
        ctx.channel_id(),
        &roles,
    )?;

    let (embed, components) = render_event(&event);
    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(format!("@everyone, new event '{}' created!", event.title))
                .embed(embed)
                .components(components)
                .allowed_mentions(serenity::CreateAllowedMentions::new().everyone(true)),
        )
        .await?;
    let message = reply.message().await?;

    info!(
        "Event '{}' created by {} in channel {} with {} slot(s) (message {})",
        event.title,
        ctx.author().name,
        event.channel_id,
        event.slots.len(),
        message.id
    );
    ctx.data().registry.insert_event(message.id, event);
    ctx.data().save_registry().await;
    Ok(())
}
