use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::{MessageId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Event;
use crate::error::{ActionError, ActionResult};

/// Seconds a swap confirmation stays valid
pub const SWAP_TIMEOUT_SECS: i64 = 60;

/// A member's pending request to move from one slot to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapProposal {
    pub id: Uuid,
    pub event_message: MessageId,
    pub user: UserId,
    pub from_slot: String,
    pub to_slot: String,
    pub created_at: DateTime<Utc>,
}

impl SwapProposal {
    pub fn new(event_message: MessageId, user: UserId, from_slot: &str, to_slot: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_message,
            user,
            from_slot: from_slot.to_string(),
            to_slot: to_slot.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(SWAP_TIMEOUT_SECS)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Only the member who asked may answer the proposal
    pub fn authorize(&self, user: UserId) -> ActionResult<()> {
        if user != self.user {
            return Err(ActionError::unauthorized(
                "the member who asked for the swap can answer it",
            ));
        }
        Ok(())
    }

    /// Apply the move to the current event state
    pub fn confirm(&self, event: &mut Event, confirming_user: UserId) -> ActionResult<()> {
        self.authorize(confirming_user)?;
        event.apply_swap(self.user, &self.from_slot, &self.to_slot)
    }

    /// Discard the proposal; the event is left untouched
    pub fn cancel(&self, cancelling_user: UserId) -> ActionResult<()> {
        self.authorize(cancelling_user)
    }
}
