use poise::serenity_prelude as serenity;
use tracing::info;

use crate::models::MAX_SLOTS;
use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(poise::CreateReply::default()
        .content("Pong! Bot is working!")
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("PT Sign-up Commands")
        .description("Create an event, then members click a slot button to sign up.")
        .field("/create_event", "Post a new event, optionally seeded from a template", false)
        .field("/template save", "Save a role list as a template (Manage Events)", false)
        .field("/template show", "Show the roles of a template", false)
        .field("/template list", "List the templates of this server", false)
        .field("/template delete", "Delete a template (Manage Events)", false)
        .field(
            "Event buttons",
            format!(
                "The event creator can add or remove slots (up to {}) and conclude the event. \
                 Concluding as completed splits the loot and posts a payout report.",
                MAX_SLOTS
            ),
            false,
        )
        .field("/ping", "Check if the bot is running", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
