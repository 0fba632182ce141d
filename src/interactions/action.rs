//! Custom-id table for every button, select menu and modal the bot sends.
//!
//! Ids have the form `pt:<verb>` or `pt:<verb>:<arg>`. Components that live on
//! an ephemeral prompt carry the id of the event message they act on, since
//! the interaction itself points at the prompt.

use poise::serenity_prelude::MessageId;
use uuid::Uuid;

const PREFIX: &str = "pt";

/// Text input ids inside modals
pub const INPUT_SLOT_NAME: &str = "slot_name";
pub const INPUT_LOOT_TOTAL: &str = "loot_total";
pub const INPUT_REPAIR_TOTAL: &str = "repair_total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Slot button on the event message
    Signup(String),
    /// Owner controls on the event message
    OpenAddSlot,
    OpenRemoveSlot,
    Leave,
    OpenConclude,
    /// Add-slot modal submitted
    AddSlotSubmitted(MessageId),
    /// Slot picked in the remove prompt
    RemoveSlotPicked(MessageId),
    /// Conclude prompt buttons
    ConcludeCompleted(MessageId),
    ConcludeCancelled(MessageId),
    /// Loot/repair modal submitted
    ReportSubmitted(MessageId),
    /// Swap prompt buttons
    ConfirmSwap(Uuid),
    CancelSwap(Uuid),
    /// Participant picked on the report message
    TogglePaid,
}

impl Action {
    pub fn custom_id(&self) -> String {
        match self {
            Action::Signup(slot) => format!("{}:signup:{}", PREFIX, slot),
            Action::OpenAddSlot => format!("{}:add", PREFIX),
            Action::OpenRemoveSlot => format!("{}:remove", PREFIX),
            Action::Leave => format!("{}:leave", PREFIX),
            Action::OpenConclude => format!("{}:conclude", PREFIX),
            Action::AddSlotSubmitted(id) => format!("{}:add_form:{}", PREFIX, id),
            Action::RemoveSlotPicked(id) => format!("{}:remove_pick:{}", PREFIX, id),
            Action::ConcludeCompleted(id) => format!("{}:complete:{}", PREFIX, id),
            Action::ConcludeCancelled(id) => format!("{}:cancel_event:{}", PREFIX, id),
            Action::ReportSubmitted(id) => format!("{}:report_form:{}", PREFIX, id),
            Action::ConfirmSwap(id) => format!("{}:swap_yes:{}", PREFIX, id),
            Action::CancelSwap(id) => format!("{}:swap_no:{}", PREFIX, id),
            Action::TogglePaid => format!("{}:paid", PREFIX),
        }
    }

    /// Parse a custom id; `None` for ids the bot did not create
    pub fn parse(custom_id: &str) -> Option<Self> {
        let rest = custom_id.strip_prefix(PREFIX)?.strip_prefix(':')?;
        let (verb, arg) = match rest.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (rest, None),
        };

        let message = || arg.and_then(parse_message_id);
        let uuid = || arg.and_then(|a| Uuid::parse_str(a).ok());

        match (verb, arg) {
            ("signup", Some(slot)) if !slot.is_empty() => Some(Action::Signup(slot.to_string())),
            ("add", None) => Some(Action::OpenAddSlot),
            ("remove", None) => Some(Action::OpenRemoveSlot),
            ("leave", None) => Some(Action::Leave),
            ("conclude", None) => Some(Action::OpenConclude),
            ("paid", None) => Some(Action::TogglePaid),
            ("add_form", _) => message().map(Action::AddSlotSubmitted),
            ("remove_pick", _) => message().map(Action::RemoveSlotPicked),
            ("complete", _) => message().map(Action::ConcludeCompleted),
            ("cancel_event", _) => message().map(Action::ConcludeCancelled),
            ("report_form", _) => message().map(Action::ReportSubmitted),
            ("swap_yes", _) => uuid().map(Action::ConfirmSwap),
            ("swap_no", _) => uuid().map(Action::CancelSwap),
            _ => None,
        }
    }
}

fn parse_message_id(raw: &str) -> Option<MessageId> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(MessageId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_parses_back() {
        let message = MessageId::new(1234567890);
        let swap = Uuid::new_v4();
        let actions = vec![
            Action::Signup("DPS Range".to_string()),
            Action::OpenAddSlot,
            Action::OpenRemoveSlot,
            Action::Leave,
            Action::OpenConclude,
            Action::AddSlotSubmitted(message),
            Action::RemoveSlotPicked(message),
            Action::ConcludeCompleted(message),
            Action::ConcludeCancelled(message),
            Action::ReportSubmitted(message),
            Action::ConfirmSwap(swap),
            Action::CancelSwap(swap),
            Action::TogglePaid,
        ];

        for action in actions {
            let id = action.custom_id();
            assert!(id.len() <= 100, "custom id too long: {}", id);
            assert_eq!(Action::parse(&id), Some(action));
        }
    }

    #[test]
    fn test_foreign_and_malformed_ids() {
        assert_eq!(Action::parse("config_global"), None);
        assert_eq!(Action::parse("pt"), None);
        assert_eq!(Action::parse("pt:signup"), None);
        assert_eq!(Action::parse("pt:signup:"), None);
        assert_eq!(Action::parse("pt:add:extra"), None);
        assert_eq!(Action::parse("pt:remove_pick:abc"), None);
        assert_eq!(Action::parse("pt:remove_pick:0"), None);
        assert_eq!(Action::parse("pt:swap_yes:not-a-uuid"), None);
        assert_eq!(Action::parse("pt:unknown"), None);
    }

    #[test]
    fn test_slot_names_keep_spaces() {
        assert_eq!(
            Action::parse("pt:signup:Main Tank"),
            Some(Action::Signup("Main Tank".to_string()))
        );
    }
}
