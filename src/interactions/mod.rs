//! Button, select menu and modal handling.
//!
//! Every component the bot sends carries a custom id from [`action::Action`].
//! [`handle_interaction`] parses it and hands the interaction to one handler
//! in [`handlers`]. Handlers reply themselves on success; rejections are
//! answered here.

pub mod action;
pub mod handlers;
pub mod render;

use poise::serenity_prelude as serenity;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::{ActionError, BotError};
use crate::Data;
use action::Action;

const GENERIC_FAILURE: &str = "Something went wrong while handling that. Please try again.";

/// Failure of a single interaction handler
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Rejected by the event rules; shown to the user as is
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Unexpected failure; logged, the user gets a generic message
    #[error(transparent)]
    Bot(#[from] BotError),
}

impl From<serenity::Error> for HandlerError {
    fn from(err: serenity::Error) -> Self {
        HandlerError::Bot(err.into())
    }
}

pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Entry point from the gateway event handler
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), BotError> {
    match interaction {
        serenity::Interaction::Component(component) => {
            let Some(action) = Action::parse(&component.data.custom_id) else {
                debug!("Ignoring component with custom id {}", component.data.custom_id);
                return Ok(());
            };
            debug!("Component {:?} from {}", action, component.user.name);

            let result = handlers::dispatch_component(ctx, component, data, action).await;
            if let Err(err) = result {
                settle_after_failure(&err, data).await;
                let reply = failure_reply(&err, &component.user.name);
                if let Err(e) = respond_ephemeral_component(ctx, component, &reply).await {
                    warn!("Could not report failure to {}: {}", component.user.name, e);
                }
            }
        }
        serenity::Interaction::Modal(modal) => {
            let Some(action) = Action::parse(&modal.data.custom_id) else {
                debug!("Ignoring modal with custom id {}", modal.data.custom_id);
                return Ok(());
            };
            debug!("Modal {:?} from {}", action, modal.user.name);

            let result = handlers::dispatch_modal(ctx, modal, data, action).await;
            if let Err(err) = result {
                settle_after_failure(&err, data).await;
                let reply = failure_reply(&err, &modal.user.name);
                if let Err(e) = respond_ephemeral_modal(ctx, modal, &reply).await {
                    warn!("Could not report failure to {}: {}", modal.user.name, e);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// A stale event may have been dropped from the registry; write that out
async fn settle_after_failure(err: &HandlerError, data: &Data) {
    if matches!(err, HandlerError::Action(ActionError::StaleState { .. })) {
        data.save_registry().await;
    }
}

fn failure_reply(err: &HandlerError, user: &str) -> String {
    match err {
        HandlerError::Action(e) => {
            debug!("Rejected action from {}: {}", user, e);
            e.to_string()
        }
        HandlerError::Bot(e) => {
            error!("Interaction from {} failed: {}", user, e);
            GENERIC_FAILURE.to_string()
        }
    }
}

/// Reply privately, falling back to a follow-up if the interaction was
/// already answered
async fn respond_ephemeral_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    content: &str,
) -> serenity::Result<()> {
    let response = serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if component.create_response(&ctx.http, response).await.is_err() {
        component
            .create_followup(
                &ctx.http,
                serenity::CreateInteractionResponseFollowup::new()
                    .content(content)
                    .ephemeral(true),
            )
            .await?;
    }
    Ok(())
}

async fn respond_ephemeral_modal(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    content: &str,
) -> serenity::Result<()> {
    let response = serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if modal.create_response(&ctx.http, response).await.is_err() {
        modal
            .create_followup(
                &ctx.http,
                serenity::CreateInteractionResponseFollowup::new()
                    .content(content)
                    .ephemeral(true),
            )
            .await?;
    }
    Ok(())
}
