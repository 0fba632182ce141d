//! `/template` subcommands for the guild's slot templates.

use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::error::ActionError;
use crate::models::{template_key, Template};
use crate::store::Upserted;
use crate::{Context, Error};

/// Discord caps autocomplete answers at 25 choices
const MAX_CHOICES: usize = 25;

/// Discord rejects embed descriptions longer than this
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Manage reusable slot templates
#[poise::command(
    slash_command,
    guild_only,
    subcommands("save", "show", "list", "delete"),
    subcommand_required
)]
pub async fn template(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Save a template from a comma-separated role list
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_EVENTS")]
pub async fn save(
    ctx: Context<'_>,
    #[description = "Template name"]
    #[autocomplete = "autocomplete_template_name"]
    name: String,
    #[description = "Roles, e.g. Tank, Healer, DPS"] roles: String,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("guild only")?;
    let template = Template::parse(&name, &roles)?;
    let role_count = template.roles.len();
    let saved_name = template.name.clone();

    let outcome = ctx.data().templates.upsert(guild, template).await?;
    let verb = match outcome {
        Upserted::Created => "saved",
        Upserted::Updated => "updated",
    };
    info!(
        "Template '{}' {} by {} in guild {} ({} roles)",
        saved_name,
        verb,
        ctx.author().name,
        guild,
        role_count
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Template '{}' {} with {} role(s).",
                saved_name, verb, role_count
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show the roles of a template
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "Template name"]
    #[autocomplete = "autocomplete_template_name"]
    name: String,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("guild only")?;
    let template = ctx
        .data()
        .templates
        .get(guild, &name)
        .await?
        .ok_or_else(|| ActionError::not_found(format!("Template '{}'", name)))?;

    let roles = template
        .roles
        .iter()
        .enumerate()
        .map(|(i, role)| format!("{}. {}", i + 1, role))
        .collect::<Vec<_>>()
        .join("\n");
    let embed = serenity::CreateEmbed::new()
        .title(format!("Template: {}", template.name))
        .description(roles)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Last updated {}",
            template.updated_at.format("%Y-%m-%d %H:%M UTC")
        )))
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List the templates of this server
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("guild only")?;
    let templates = ctx.data().templates.list(guild).await?;

    if templates.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No templates saved yet. Use `/template save` to create one.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("Templates ({})", templates.len()))
        .description(list_description(&templates))
        .footer(serenity::CreateEmbedFooter::new(
            "Use /template show to see the roles of a template.",
        ))
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Delete a template
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_EVENTS")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Template name"]
    #[autocomplete = "autocomplete_template_name"]
    name: String,
) -> Result<(), Error> {
    let guild = ctx.guild_id().ok_or("guild only")?;
    if !ctx.data().templates.delete(guild, &name).await? {
        return Err(ActionError::not_found(format!("Template '{}'", name)).into());
    }

    info!(
        "Template '{}' deleted by {} in guild {}",
        name,
        ctx.author().name,
        guild
    );
    ctx.send(
        poise::CreateReply::default()
            .content(format!("Template '{}' deleted.", name))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

pub async fn autocomplete_template_name(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let Some(guild) = ctx.guild_id() else {
        return Vec::new();
    };

    match ctx.data().templates.list(guild).await {
        Ok(templates) => matching_names(&templates, partial),
        Err(e) => {
            warn!("Template autocomplete failed for guild {}: {}", guild, e);
            Vec::new()
        }
    }
}

/// One line per template with its role count, cut short to fit an embed
fn list_description(templates: &[Template]) -> String {
    let mut description = String::new();
    for (shown, template) in templates.iter().enumerate() {
        let line = format!("**{}** ({} roles)\n", template.name, template.roles.len());
        let more = format!("...and {} more", templates.len() - shown);
        if description.chars().count() + line.chars().count() + more.chars().count()
            > EMBED_DESCRIPTION_LIMIT
        {
            description.push_str(&more);
            return description;
        }
        description.push_str(&line);
    }
    description.trim_end().to_string()
}

fn matching_names(templates: &[Template], partial: &str) -> Vec<String> {
    let partial = template_key(partial);
    templates
        .iter()
        .filter(|t| t.key().contains(&partial))
        .take(MAX_CHOICES)
        .map(|t| t.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MAX_NAME_LEN, MAX_SLOTS};

    #[test]
    fn test_matching_names() {
        let templates = vec![
            Template::parse("Avalon Roads", "Tank").unwrap(),
            Template::parse("Static Dungeon", "Tank").unwrap(),
            Template::parse("ZvZ", "Tank").unwrap(),
        ];

        assert_eq!(matching_names(&templates, ""), vec!["Avalon Roads", "Static Dungeon", "ZvZ"]);
        assert_eq!(matching_names(&templates, "  ROADS"), vec!["Avalon Roads"]);
        assert!(matching_names(&templates, "hellgate").is_empty());
    }

    fn full_template(index: usize) -> Template {
        let name = format!("{:0>width$}", index, width = MAX_NAME_LEN);
        let roles = (0..MAX_SLOTS)
            .map(|r| format!("{:x>width$}", r, width = MAX_NAME_LEN))
            .collect::<Vec<_>>()
            .join(",");
        Template::parse(&name, &roles).unwrap()
    }

    #[test]
    fn test_list_description_fits_embed() {
        let few: Vec<Template> = (0..5).map(full_template).collect();
        let description = list_description(&few);
        assert_eq!(description.lines().count(), 5);
        assert!(description.contains(&format!("({} roles)", MAX_SLOTS)));

        let many: Vec<Template> = (0..500).map(full_template).collect();
        let description = list_description(&many);
        assert!(description.chars().count() <= EMBED_DESCRIPTION_LIMIT);
        assert!(description.ends_with("more"));
    }
}
