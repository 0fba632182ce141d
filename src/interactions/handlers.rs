use poise::serenity_prelude as serenity;
use poise::serenity_prelude::{MessageId, UserId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::action::{Action, INPUT_LOOT_TOTAL, INPUT_REPAIR_TOTAL, INPUT_SLOT_NAME};
use super::render::{self, mention};
use super::{HandlerError, HandlerResult};
use crate::error::{ActionError, ActionResult};
use crate::models::{parse_amount, Conclusion, Event, SignupOutcome, SwapProposal};
use crate::Data;

pub async fn dispatch_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    action: Action,
) -> HandlerResult {
    let event_message = component.message.id;
    let user = component.user.id;

    match action {
        Action::Signup(slot) => signup(ctx, component, data, event_message, &slot).await,
        Action::Leave => leave(ctx, component, data, event_message).await,
        Action::OpenAddSlot => {
            let handle = data.registry.event(event_message)?;
            handle.lock().await.ensure_owner_of_open(user, "add slots")?;
            component
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Modal(render::add_slot_modal(event_message)),
                )
                .await?;
            Ok(())
        }
        Action::OpenRemoveSlot => {
            let handle = data.registry.event(event_message)?;
            let prompt = {
                let event = handle.lock().await;
                event.ensure_owner_of_open(user, "remove slots")?;
                if event.slots.is_empty() {
                    return Err(ActionError::not_found("Slot to remove").into());
                }
                render::remove_slot_prompt(event_message, &event)
            };
            component
                .create_response(&ctx.http, serenity::CreateInteractionResponse::Message(prompt))
                .await?;
            Ok(())
        }
        Action::OpenConclude => {
            let handle = data.registry.event(event_message)?;
            handle.lock().await.ensure_owner_of_open(user, "conclude the event")?;
            component
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Message(render::conclude_prompt(
                        event_message,
                    )),
                )
                .await?;
            Ok(())
        }
        Action::RemoveSlotPicked(target) => remove_slot(ctx, component, data, target).await,
        Action::ConcludeCompleted(target) => {
            let handle = data.registry.event(target)?;
            handle.lock().await.ensure_owner_of_open(user, "conclude the event")?;
            component
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Modal(render::report_modal(target)),
                )
                .await?;
            Ok(())
        }
        Action::ConcludeCancelled(target) => cancel_event(ctx, component, data, target).await,
        Action::ConfirmSwap(id) => confirm_swap(ctx, component, data, id).await,
        Action::CancelSwap(id) => cancel_swap(ctx, component, data, id).await,
        Action::TogglePaid => toggle_paid(ctx, component, data).await,
        other @ (Action::AddSlotSubmitted(_) | Action::ReportSubmitted(_)) => {
            debug!("Ignoring modal action {:?} sent as a component", other);
            Ok(())
        }
    }
}

pub async fn dispatch_modal(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
    action: Action,
) -> HandlerResult {
    match action {
        Action::AddSlotSubmitted(target) => add_slot(ctx, modal, data, target).await,
        Action::ReportSubmitted(target) => complete_event(ctx, modal, data, target).await,
        other => {
            debug!("Ignoring component action {:?} sent as a modal", other);
            Ok(())
        }
    }
}

/// Slot button: join an empty slot or ask to swap
async fn signup(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    event_message: MessageId,
    slot: &str,
) -> HandlerResult {
    let user = component.user.id;
    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    let mut draft = event.clone();
    match draft.signup(user, slot)? {
        SignupOutcome::Joined { slot } => {
            publish(ctx, data, event_message, &mut event, draft).await?;
            drop(event);

            info!("{} signed up as {} on event {}", component.user.name, slot, event_message);
            reply_ephemeral(ctx, component, format!("You signed up as **{}**!", slot)).await?;
            data.save_registry().await;
        }
        SignupOutcome::SwapRequested { from, to } => {
            drop(event);

            let proposal = SwapProposal::new(event_message, user, &from, &to);
            let prompt = render::swap_prompt(&proposal);
            data.registry.propose_swap(proposal);
            component
                .create_response(&ctx.http, serenity::CreateInteractionResponse::Message(prompt))
                .await?;
        }
    }
    Ok(())
}

async fn leave(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    event_message: MessageId,
) -> HandlerResult {
    let user = component.user.id;
    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    let slot = apply(ctx, data, event_message, &mut event, |e| e.leave(user)).await?;
    drop(event);

    info!("{} left {} on event {}", component.user.name, slot, event_message);
    reply_ephemeral(ctx, component, format!("You left **{}**.", slot)).await?;
    data.save_registry().await;
    Ok(())
}

async fn add_slot(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
    event_message: MessageId,
) -> HandlerResult {
    let user = modal.user.id;
    let name = modal_value(modal, INPUT_SLOT_NAME).unwrap_or_default();
    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    let name = apply(ctx, data, event_message, &mut event, |e| e.add_slot(user, &name)).await?;
    drop(event);

    info!("Slot {} added to event {}", name, event_message);
    modal
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(format!("Slot '{}' added!", name))
                    .ephemeral(true),
            ),
        )
        .await?;
    data.save_registry().await;
    Ok(())
}

async fn remove_slot(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    event_message: MessageId,
) -> HandlerResult {
    let user = component.user.id;
    let name = match &component.data.kind {
        serenity::ComponentInteractionDataKind::StringSelect { values } => values.first().cloned(),
        _ => None,
    }
    .ok_or_else(|| ActionError::not_found("Selected slot"))?;

    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    let removed =
        apply(ctx, data, event_message, &mut event, |e| e.remove_slot(user, &name)).await?;
    drop(event);

    info!("Slot {} removed from event {}", removed.name, event_message);
    let content = match removed.occupant {
        Some(occupant) => format!(
            "Slot '{}' removed. {} is no longer signed up.",
            removed.name,
            mention(occupant)
        ),
        None => format!("Slot '{}' removed.", removed.name),
    };
    close_prompt(ctx, component, content).await?;
    data.save_registry().await;
    Ok(())
}

async fn confirm_swap(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    id: Uuid,
) -> HandlerResult {
    let user = component.user.id;
    let proposal = data.registry.swap(id)?;
    proposal.authorize(user)?;

    let handle = data.registry.event(proposal.event_message)?;
    let mut event = handle.lock().await;

    let moved = apply(ctx, data, proposal.event_message, &mut event, |e| {
        proposal.confirm(e, user)
    })
    .await;
    drop(event);

    // A rejected swap cannot succeed later; a failed edit can be retried
    if !matches!(moved, Err(HandlerError::Bot(_))) {
        data.registry.take_swap(id);
    }
    moved?;

    info!(
        "{} moved from {} to {} on event {}",
        component.user.name, proposal.from_slot, proposal.to_slot, proposal.event_message
    );
    close_prompt(ctx, component, format!("Swapped to **{}**!", proposal.to_slot)).await?;
    data.save_registry().await;
    Ok(())
}

async fn cancel_swap(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    id: Uuid,
) -> HandlerResult {
    let proposal = data.registry.swap(id)?;
    proposal.cancel(component.user.id)?;
    data.registry.take_swap(id);

    close_prompt(ctx, component, "Swap cancelled.".to_string()).await?;
    Ok(())
}

async fn cancel_event(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
    event_message: MessageId,
) -> HandlerResult {
    let user = component.user.id;
    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    apply(ctx, data, event_message, &mut event, |e| {
        e.conclude(user, Conclusion::Cancelled)
    })
    .await?;
    data.registry.remove_event(event_message);
    drop(event);

    info!("Event {} cancelled by {}", event_message, component.user.name);
    close_prompt(ctx, component, "Event cancelled.".to_string()).await?;
    data.save_registry().await;
    Ok(())
}

/// Report modal: split the loot, post the report, close the event
async fn complete_event(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
    event_message: MessageId,
) -> HandlerResult {
    let loot_total = parse_amount(&modal_value(modal, INPUT_LOOT_TOTAL).unwrap_or_default())?;
    let repair_total = match modal_value(modal, INPUT_REPAIR_TOTAL) {
        Some(raw) if !raw.trim().is_empty() => parse_amount(&raw)?,
        _ => 0,
    };

    let handle = data.registry.event(event_message)?;
    let mut event = handle.lock().await;

    // Work on a copy so the event stays open if posting the report fails
    let mut concluded = event.clone();
    let report = concluded
        .conclude(
            modal.user.id,
            Conclusion::Completed {
                loot_total,
                repair_total,
            },
        )?
        .ok_or(ActionError::NoParticipants)?;

    let report_channel = data.config.report_channel.unwrap_or(event.channel_id);
    let (embed, components) = render::render_report(&report);
    let report_message = report_channel
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .content(format!("Report for **{}**", report.event_title))
                .embed(embed)
                .components(components),
        )
        .await?;

    // The report exists now, so the event is closed even if its message
    // cannot be updated
    data.registry.insert_report(report_message.id, report);
    data.registry.remove_event(event_message);
    if let Err(e) = edit_event_message(ctx, event_message, &concluded).await {
        warn!("Event {} completed but its message was not updated: {}", event_message, e);
    }
    *event = concluded;
    drop(event);

    info!(
        "Event {} completed by {}: loot {}, repair {}, report {}",
        event_message, modal.user.name, loot_total, repair_total, report_message.id
    );
    modal
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(format!("Event concluded! Report posted in <#{}>.", report_channel))
                    .ephemeral(true),
            ),
        )
        .await?;
    data.save_registry().await;
    Ok(())
}

/// User picker on a report message
async fn toggle_paid(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
) -> HandlerResult {
    let selected: Vec<UserId> = match &component.data.kind {
        serenity::ComponentInteractionDataKind::UserSelect { values } => values.clone(),
        _ => Vec::new(),
    };
    if selected.is_empty() {
        return Err(ActionError::not_found("Selected participant").into());
    }

    let handle = data.registry.report(component.message.id)?;
    let mut report = handle.lock().await;

    // All or nothing
    if let Some(outsider) = selected
        .iter()
        .find(|user| !report.participants.iter().any(|p| p.user == **user))
    {
        report.ensure_owner(component.user.id)?;
        return Err(ActionError::not_found(format!("Participant {}", mention(*outsider))).into());
    }

    for user in &selected {
        let paid = report.toggle_paid(component.user.id, *user)?;
        info!(
            "{} marked {} as {} on report {}",
            component.user.name,
            user,
            if paid { "paid" } else { "unpaid" },
            component.message.id
        );
    }

    let (embed, components) = render::render_report(&report);
    if report.all_paid() {
        data.registry.remove_report(component.message.id);
        info!("Report {} settled, everyone is paid", component.message.id);
    }
    drop(report);

    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .components(components),
            ),
        )
        .await?;
    data.save_registry().await;
    Ok(())
}

/// Apply `change` to a copy of the event, show the copy on the event
/// message, then commit it. The record is unchanged if any step fails.
async fn apply<T>(
    ctx: &serenity::Context,
    data: &Data,
    event_message: MessageId,
    event: &mut Event,
    change: impl FnOnce(&mut Event) -> ActionResult<T>,
) -> Result<T, HandlerError> {
    let (draft, outcome) = event.preview(change)?;
    publish(ctx, data, event_message, event, draft).await?;
    Ok(outcome)
}

/// Commit `draft` once the event message shows it. A deleted event message
/// drops the event from the registry.
async fn publish(
    ctx: &serenity::Context,
    data: &Data,
    event_message: MessageId,
    event: &mut Event,
    draft: Event,
) -> HandlerResult {
    match edit_event_message(ctx, event_message, &draft).await {
        Ok(()) => {
            *event = draft;
            Ok(())
        }
        Err(e) if is_unknown_message(&e) => {
            warn!("Event message {} is gone, dropping the event", event_message);
            data.registry.remove_event(event_message);
            Err(ActionError::stale("the event message was deleted").into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_event_message(
    ctx: &serenity::Context,
    event_message: MessageId,
    event: &Event,
) -> serenity::Result<()> {
    let (embed, components) = render::render_event(event);
    event
        .channel_id
        .edit_message(
            &ctx.http,
            event_message,
            serenity::EditMessage::new().embed(embed).components(components),
        )
        .await?;
    Ok(())
}

fn is_unknown_message(err: &serenity::Error) -> bool {
    matches!(
        err,
        serenity::Error::Http(http) if http.status_code().map(|status| status.as_u16()) == Some(404)
    )
}

async fn reply_ephemeral(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    content: String,
) -> serenity::Result<()> {
    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
}

/// Replace an ephemeral prompt with a final message and no components
async fn close_prompt(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    content: String,
) -> serenity::Result<()> {
    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(Vec::new()),
            ),
        )
        .await
}

/// Value typed into a modal text input
fn modal_value(modal: &serenity::ModalInteraction, input_id: &str) -> Option<String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            serenity::ActionRowComponent::InputText(input) if input.custom_id == input_id => {
                input.value.clone()
            }
            _ => None,
        })
}
