use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::time::Instant;
use tracing::{error, info, warn};

/// Discord bot for PT sign-up sheets and loot splitting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod interactions;
mod logging;
mod models;
mod state;
mod store;
mod web;

use commands::{create_event, help, ping, template};
use config::BotConfig;
use error::ActionError;
use state::{create_shared_event_registry, EventRegistry, RegistrySnapshot, SharedEventRegistry};
use store::{open_template_store, SharedTemplateStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: BotConfig,
    pub registry: SharedEventRegistry,
    pub templates: SharedTemplateStore,
}

impl Data {
    /// Persist the event registry; failures are logged, not surfaced
    pub async fn save_registry(&self) {
        let path = self.config.events_state_file();
        if let Err(e) = self.registry.persist(&path).await {
            error!("Failed to save event state to {}: {}", path, e);
        }
    }
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = interactions::handle_interaction(ctx, interaction, data).await {
            error!("Failed to handle interaction: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Create log buffer for the keep-alive /logs endpoint
    let log_buffer = logging::create_log_buffer(1000);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    let config = BotConfig::from_env()?;
    log_bot_id(&config.token);

    tokio::fs::create_dir_all(&config.state_path).await.ok();
    tokio::fs::create_dir_all(&config.data_path).await.ok();

    info!("Loading event state...");
    let snapshot = RegistrySnapshot::load(&config.events_state_file())
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load event state: {}, starting empty", e);
            RegistrySnapshot::default()
        });
    let registry = create_shared_event_registry(EventRegistry::from_snapshot(snapshot));

    let templates = open_template_store(&config.template_store).await?;

    match config.keep_alive_port {
        Some(port) => {
            let keep_alive = web::KeepAliveState {
                registry: registry.clone(),
                log_buffer: log_buffer.clone(),
                started_at: Instant::now(),
            };
            tokio::spawn(async move {
                if let Err(e) = web::start_keep_alive_server(port, keep_alive).await {
                    error!("Keep-alive server error: {}", e);
                }
            });
        }
        None => info!("Keep-alive server disabled"),
    }

    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let token = config.token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), create_event(), template()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            let reply = match error.downcast_ref::<ActionError>() {
                                Some(rejection) => {
                                    info!("Command '{}' rejected for {}: {}", ctx.command().qualified_name, ctx.author().name, rejection);
                                    rejection.to_string()
                                }
                                None => {
                                    error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                                    "Something went wrong while running that command.".to_string()
                                }
                            };
                            let _ = ctx
                                .send(poise::CreateReply::default().content(reply).ephemeral(true))
                                .await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            warn!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("You need the Manage Events permission to do that.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || target_guild_id.is_some() {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                Ok(Data {
                    config,
                    registry,
                    templates,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    warn!("Bot ended.");

    Ok(())
}

/// Log the application id encoded in the first token segment
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    // Discord tokens use URL-safe base64 without padding
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Ok(Ok(id_str)) = decoded.map(String::from_utf8) {
        info!("Bot ID: {} (invite at https://discord.com/developers/applications/{}/oauth2)", id_str, id_str);
    }
}
