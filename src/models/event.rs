use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use serde::{Deserialize, Serialize};

use super::names::{normalize_name, same_name};
use super::report::Report;
use crate::error::{ActionError, ActionResult};

/// Most slots an event can hold. A message carries five rows of five buttons
/// and the first row holds the owner controls.
pub const MAX_SLOTS: usize = 20;

/// Text limits keeping the event embed inside Discord's size caps
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_SCHEDULE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// A named role opening holding zero or one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub occupant: Option<UserId>,
}

impl Slot {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            occupant: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Open,
    Cancelled,
    Completed,
}

/// How the owner closes an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conclusion {
    Cancelled,
    Completed { loot_total: u64, repair_total: u64 },
}

/// Result of clicking a slot button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// The member now holds the slot
    Joined { slot: String },
    /// The member holds another slot and must confirm moving
    SwapRequested { from: String, to: String },
}

/// One organized activity and its slot roster.
///
/// This is the authoritative record; the Discord message is rendered from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub schedule: String,
    pub description: String,
    pub owner: UserId,
    pub owner_name: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub slots: Vec<Slot>,
    pub phase: EventPhase,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create an open event seeded with the given role names
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: &str,
        schedule: &str,
        description: &str,
        owner: UserId,
        owner_name: &str,
        guild_id: Option<GuildId>,
        channel_id: ChannelId,
        roles: &[String],
    ) -> ActionResult<Self> {
        let mut event = Self {
            title: bounded_text("title", title, MAX_TITLE_LEN)?,
            schedule: bounded_text("time", schedule, MAX_SCHEDULE_LEN)?,
            description: bounded_text("description", description, MAX_DESCRIPTION_LEN)?,
            owner,
            owner_name: owner_name.to_string(),
            guild_id,
            channel_id,
            slots: Vec::with_capacity(roles.len()),
            phase: EventPhase::Open,
            created_at: Utc::now(),
        };

        for role in roles {
            event.push_slot(role)?;
        }

        Ok(event)
    }

    pub fn is_open(&self) -> bool {
        self.phase == EventPhase::Open
    }

    /// Index of a slot by case-insensitive name
    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| same_name(&s.name, name))
    }

    /// The slot a member currently holds
    pub fn slot_of(&self, user: UserId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.occupant == Some(user))
    }

    /// Distinct occupants in slot order
    pub fn participants(&self) -> Vec<UserId> {
        let mut seen = Vec::new();
        for user in self.slots.iter().filter_map(|s| s.occupant) {
            if !seen.contains(&user) {
                seen.push(user);
            }
        }
        seen
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }

    /// Sign a member up for a slot.
    ///
    /// A member who already holds a different slot gets a swap request
    /// instead of being moved.
    pub fn signup(&mut self, user: UserId, slot_name: &str) -> ActionResult<SignupOutcome> {
        self.ensure_open()?;

        let index = self
            .find_slot(slot_name)
            .ok_or_else(|| ActionError::not_found(format!("Slot '{}'", slot_name)))?;
        let target = &self.slots[index];

        match target.occupant {
            Some(occupant) if occupant == user => {
                return Err(ActionError::AlreadySignedUp {
                    name: target.name.clone(),
                })
            }
            Some(_) => {
                return Err(ActionError::AlreadyOccupied {
                    name: target.name.clone(),
                })
            }
            None => {}
        }

        if let Some(current) = self.slot_of(user) {
            return Ok(SignupOutcome::SwapRequested {
                from: current.name.clone(),
                to: self.slots[index].name.clone(),
            });
        }

        self.slots[index].occupant = Some(user);
        Ok(SignupOutcome::Joined {
            slot: self.slots[index].name.clone(),
        })
    }

    /// Move a member between slots. Both slots are looked up again by name.
    pub fn apply_swap(&mut self, user: UserId, from: &str, to: &str) -> ActionResult<()> {
        self.ensure_open()?;

        let from_index = self
            .find_slot(from)
            .ok_or_else(|| ActionError::stale(format!("slot '{}' was removed", from)))?;
        let to_index = self
            .find_slot(to)
            .ok_or_else(|| ActionError::stale(format!("slot '{}' was removed", to)))?;

        if self.slots[from_index].occupant != Some(user) {
            return Err(ActionError::stale(format!(
                "you no longer hold '{}'",
                self.slots[from_index].name
            )));
        }
        if self.slots[to_index].occupant.is_some() {
            return Err(ActionError::stale(format!(
                "'{}' was taken",
                self.slots[to_index].name
            )));
        }

        self.slots[from_index].occupant = None;
        self.slots[to_index].occupant = Some(user);
        Ok(())
    }

    /// Free the slot held by a member
    pub fn leave(&mut self, user: UserId) -> ActionResult<String> {
        self.ensure_open()?;

        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.occupant == Some(user))
            .ok_or_else(|| ActionError::not_found("Your signup"))?;
        slot.occupant = None;
        Ok(slot.name.clone())
    }

    /// Append an empty slot (owner only)
    pub fn add_slot(&mut self, requester: UserId, name: &str) -> ActionResult<String> {
        self.ensure_open()?;
        self.ensure_owner(requester, "add slots")?;
        self.push_slot(name)
    }

    /// Remove a slot and its occupant (owner only)
    pub fn remove_slot(&mut self, requester: UserId, name: &str) -> ActionResult<Slot> {
        self.ensure_open()?;
        self.ensure_owner(requester, "remove slots")?;

        let index = self
            .find_slot(name)
            .ok_or_else(|| ActionError::not_found(format!("Slot '{}'", name)))?;
        Ok(self.slots.remove(index))
    }

    /// Close the event (owner only). A completed event produces a report; if
    /// the report cannot be computed the event stays open.
    pub fn conclude(
        &mut self,
        requester: UserId,
        conclusion: Conclusion,
    ) -> ActionResult<Option<Report>> {
        self.ensure_open()?;
        self.ensure_owner(requester, "conclude the event")?;

        match conclusion {
            Conclusion::Cancelled => {
                self.phase = EventPhase::Cancelled;
                Ok(None)
            }
            Conclusion::Completed {
                loot_total,
                repair_total,
            } => {
                let report = Report::compute(
                    &self.title,
                    self.owner,
                    &self.participants(),
                    loot_total,
                    repair_total,
                )?;
                self.phase = EventPhase::Completed;
                Ok(Some(report))
            }
        }
    }

    /// Check that an owner-only action may proceed
    pub fn ensure_owner(&self, requester: UserId, action: &str) -> ActionResult<()> {
        if requester != self.owner {
            return Err(ActionError::unauthorized(format!(
                "the event creator can {}",
                action
            )));
        }
        Ok(())
    }

    /// Run `change` on a copy, leaving this record as it is. The caller
    /// commits the copy once the change is visible.
    pub fn preview<T>(
        &self,
        change: impl FnOnce(&mut Event) -> ActionResult<T>,
    ) -> ActionResult<(Event, T)> {
        let mut draft = self.clone();
        let outcome = change(&mut draft)?;
        Ok((draft, outcome))
    }

    /// Both checks an owner control performs before opening a form
    pub fn ensure_owner_of_open(&self, requester: UserId, action: &str) -> ActionResult<()> {
        self.ensure_open()?;
        self.ensure_owner(requester, action)
    }

    fn ensure_open(&self) -> ActionResult<()> {
        if !self.is_open() {
            return Err(ActionError::not_found("Open event"));
        }
        Ok(())
    }

    fn push_slot(&mut self, raw: &str) -> ActionResult<String> {
        let name = normalize_name(raw)?;
        if self.find_slot(&name).is_some() {
            return Err(ActionError::DuplicateSlot { name });
        }
        if self.slots.len() >= MAX_SLOTS {
            return Err(ActionError::TooManySlots { max: MAX_SLOTS });
        }
        self.slots.push(Slot::empty(name.clone()));
        Ok(name)
    }
}

fn bounded_text(what: &str, raw: &str, max: usize) -> ActionResult<String> {
    let text = raw.trim();
    if text.chars().count() > max {
        return Err(ActionError::InvalidName {
            reason: format!("the {} is longer than {} characters", what, max),
        });
    }
    Ok(text.to_string())
}
