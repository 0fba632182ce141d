//! Pure projection of events and reports into Discord embeds and components.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::{MessageId, UserId};

use super::action::{Action, INPUT_LOOT_TOTAL, INPUT_REPAIR_TOTAL, INPUT_SLOT_NAME};
use crate::models::{format_amount, Event, EventPhase, Report, SwapProposal};

const COLOR_OPEN: u32 = 0xF1C40F;
const COLOR_COMPLETED: u32 = 0x2ECC71;
const COLOR_CANCELLED: u32 = 0x95A5A6;
const COLOR_REPORT: u32 = 0x3498DB;

const EVENT_THUMBNAIL: &str =
    "https://assets.albiononline.com/assets/images/items/T8_CHEST_AVALONIAN_ELITE.png";
const EMPTY_SLOT: &str = "Empty";
const BUTTONS_PER_ROW: usize = 5;

pub fn mention(user: UserId) -> String {
    format!("<@{}>", user.get())
}

/// Embed and components of an event message
pub fn render_event(event: &Event) -> (serenity::CreateEmbed, Vec<serenity::CreateActionRow>) {
    let (title, color, status) = match event.phase {
        EventPhase::Open => (format!("📢 Event: {}", event.title), COLOR_OPEN, None),
        EventPhase::Completed => (
            format!("✅ Event: {}", event.title),
            COLOR_COMPLETED,
            Some("**This event is completed.**"),
        ),
        EventPhase::Cancelled => (
            format!("❌ Event: {}", event.title),
            COLOR_CANCELLED,
            Some("**This event was cancelled.**"),
        ),
    };

    let description = if event.description.is_empty() {
        "No description."
    } else {
        event.description.as_str()
    };

    let mut body = format!(
        "**Time:** {}\n**Description:** {}\n\n",
        event.schedule, description
    );
    if let Some(status) = status {
        body.push_str(status);
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "**Slots ({}/{}):**",
        event.filled_count(),
        event.slots.len()
    ));

    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .description(body)
        .color(color)
        .thumbnail(EVENT_THUMBNAIL)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Event created by {}",
            event.owner_name
        )));

    for slot in &event.slots {
        let value = slot.occupant.map(mention).unwrap_or_else(|| EMPTY_SLOT.to_string());
        embed = embed.field(&slot.name, value, false);
    }

    let components = if event.is_open() {
        event_components(event)
    } else {
        Vec::new()
    };

    (embed, components)
}

/// Owner controls on the first row, then one button per slot sorted by name
fn event_components(event: &Event) -> Vec<serenity::CreateActionRow> {
    let controls = vec![
        serenity::CreateButton::new(Action::OpenAddSlot.custom_id())
            .label("➕ Add slot")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(Action::OpenRemoveSlot.custom_id())
            .label("🗑️ Remove slot")
            .style(serenity::ButtonStyle::Danger)
            .disabled(event.slots.is_empty()),
        serenity::CreateButton::new(Action::Leave.custom_id())
            .label("🚪 Leave")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(event.filled_count() == 0),
        serenity::CreateButton::new(Action::OpenConclude.custom_id())
            .label("🏁 Conclude")
            .style(serenity::ButtonStyle::Primary),
    ];

    let mut slots: Vec<_> = event.slots.iter().collect();
    slots.sort_by_key(|s| s.name.to_lowercase());

    let slot_buttons: Vec<serenity::CreateButton> = slots
        .into_iter()
        .map(|slot| {
            let style = if slot.occupant.is_some() {
                serenity::ButtonStyle::Secondary
            } else {
                serenity::ButtonStyle::Primary
            };
            serenity::CreateButton::new(Action::Signup(slot.name.clone()).custom_id())
                .label(&slot.name)
                .style(style)
        })
        .collect();

    let mut rows = vec![serenity::CreateActionRow::Buttons(controls)];
    rows.extend(
        slot_buttons
            .chunks(BUTTONS_PER_ROW)
            .map(|chunk| serenity::CreateActionRow::Buttons(chunk.to_vec())),
    );
    rows
}

/// Embed and components of a payout report message
pub fn render_report(report: &Report) -> (serenity::CreateEmbed, Vec<serenity::CreateActionRow>) {
    let roster = report
        .participants
        .iter()
        .map(|p| {
            let status = if p.paid { "✅ paid" } else { "⏳ pending" };
            format!("{} - {}", mention(p.user), status)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("💰 Report: {}", report.event_title))
        .description(format!(
            "**Participants ({}/{} paid):**\n{}",
            report.paid_count(),
            report.participants.len(),
            roster
        ))
        .color(if report.all_paid() { COLOR_COMPLETED } else { COLOR_REPORT })
        .field("Total loot", format_amount(to_i64(report.loot_total)), true)
        .field("Total repair", format_amount(to_i64(report.repair_total)), true)
        .field("Participants", report.participants.len().to_string(), true)
        .field("Loot per person", format_amount(to_i64(report.loot_per_person)), true)
        .field("Repair per person", format_amount(to_i64(report.repair_per_person)), true)
        .field("Net per person", format_amount(report.net_per_person), true);

    let (loot_rest, repair_rest) = (report.loot_remainder(), report.repair_remainder());
    if loot_rest > 0 || repair_rest > 0 {
        embed = embed.field(
            "Not split (rounding)",
            format!(
                "Loot: {} · Repair: {}",
                format_amount(to_i64(loot_rest)),
                format_amount(to_i64(repair_rest))
            ),
            false,
        );
    }

    if report.all_paid() {
        embed = embed.footer(serenity::CreateEmbedFooter::new("Everyone has been paid."));
        return (embed, Vec::new());
    }

    let picker = serenity::CreateSelectMenu::new(
        Action::TogglePaid.custom_id(),
        serenity::CreateSelectMenuKind::User {
            default_users: None,
        },
    )
    .placeholder("Mark participants as paid / unpaid")
    .min_values(1)
    .max_values(picker_size(report.participants.len()));

    (embed, vec![serenity::CreateActionRow::SelectMenu(picker)])
}

/// Discord select menus take between 1 and 25 values
fn picker_size(participants: usize) -> u8 {
    participants.clamp(1, 25) as u8
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Ephemeral prompt asking a member to confirm a slot swap
pub fn swap_prompt(proposal: &SwapProposal) -> serenity::CreateInteractionResponseMessage {
    let buttons = vec![
        serenity::CreateButton::new(Action::ConfirmSwap(proposal.id).custom_id())
            .label("Yes, swap!")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(Action::CancelSwap(proposal.id).custom_id())
            .label("Cancel")
            .style(serenity::ButtonStyle::Danger),
    ];

    serenity::CreateInteractionResponseMessage::new()
        .content(format!(
            "Do you want to move from **{}** to **{}**?",
            proposal.from_slot, proposal.to_slot
        ))
        .components(vec![serenity::CreateActionRow::Buttons(buttons)])
        .ephemeral(true)
}

/// Ephemeral prompt listing slots the owner can remove
pub fn remove_slot_prompt(
    event_message: MessageId,
    event: &Event,
) -> serenity::CreateInteractionResponseMessage {
    let options = event
        .slots
        .iter()
        .map(|slot| {
            let mut option = serenity::CreateSelectMenuOption::new(&slot.name, &slot.name);
            if slot.occupant.is_some() {
                option = option.description("Taken");
            }
            option
        })
        .collect();

    let menu = serenity::CreateSelectMenu::new(
        Action::RemoveSlotPicked(event_message).custom_id(),
        serenity::CreateSelectMenuKind::String { options },
    )
    .placeholder("Select the slot to remove...");

    serenity::CreateInteractionResponseMessage::new()
        .content("Which slot do you want to remove?")
        .components(vec![serenity::CreateActionRow::SelectMenu(menu)])
        .ephemeral(true)
}

/// Ephemeral prompt for closing an event
pub fn conclude_prompt(event_message: MessageId) -> serenity::CreateInteractionResponseMessage {
    let buttons = vec![
        serenity::CreateButton::new(Action::ConcludeCompleted(event_message).custom_id())
            .label("Completed, split the loot")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(Action::ConcludeCancelled(event_message).custom_id())
            .label("Cancel event")
            .style(serenity::ButtonStyle::Danger),
    ];

    serenity::CreateInteractionResponseMessage::new()
        .content("How did the event go?")
        .components(vec![serenity::CreateActionRow::Buttons(buttons)])
        .ephemeral(true)
}

pub fn add_slot_modal(event_message: MessageId) -> serenity::CreateModal {
    let input = serenity::CreateInputText::new(
        serenity::InputTextStyle::Short,
        "Slot name",
        INPUT_SLOT_NAME,
    )
    .placeholder("E.g. Tank, Healer, DPS Range...")
    .max_length(crate::models::MAX_NAME_LEN as u16)
    .required(true);

    serenity::CreateModal::new(Action::AddSlotSubmitted(event_message).custom_id(), "Add slot")
        .components(vec![serenity::CreateActionRow::InputText(input)])
}

pub fn report_modal(event_message: MessageId) -> serenity::CreateModal {
    let loot = serenity::CreateInputText::new(
        serenity::InputTextStyle::Short,
        "Total loot",
        INPUT_LOOT_TOTAL,
    )
    .placeholder("E.g. 1.500.000 or 1.5m")
    .required(true);
    let repair = serenity::CreateInputText::new(
        serenity::InputTextStyle::Short,
        "Total repair cost",
        INPUT_REPAIR_TOTAL,
    )
    .placeholder("E.g. 200k (leave empty for none)")
    .required(false);

    serenity::CreateModal::new(Action::ReportSubmitted(event_message).custom_id(), "Event report")
        .components(vec![
            serenity::CreateActionRow::InputText(loot),
            serenity::CreateActionRow::InputText(repair),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conclusion;
    use poise::serenity_prelude::ChannelId;
    use serde_json::Value;

    const OWNER: UserId = UserId::new(1);

    fn event() -> Event {
        let roles: Vec<String> = ["Tank", "healer", "DPS"].iter().map(|r| r.to_string()).collect();
        Event::new("Avalon", "20:00", "", OWNER, "Owner", None, ChannelId::new(3), &roles).unwrap()
    }

    fn custom_ids(rows: &[serenity::CreateActionRow]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                let row = serde_json::to_value(row).unwrap();
                row["components"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|c| c["custom_id"].as_str().unwrap().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_open_event_layout() {
        let mut event = event();
        event.signup(UserId::new(7), "Tank").unwrap();
        let (embed, rows) = render_event(&event);

        let embed: Value = serde_json::to_value(&embed).unwrap();
        assert_eq!(embed["title"], "📢 Event: Avalon");
        assert!(embed["description"].as_str().unwrap().contains("No description."));
        assert!(embed["description"].as_str().unwrap().contains("**Slots (1/3):**"));
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0]["name"], "Tank");
        assert_eq!(fields[0]["value"], "<@7>");
        assert_eq!(fields[1]["value"], EMPTY_SLOT);

        let ids = custom_ids(&rows);
        assert_eq!(ids[0], vec!["pt:add", "pt:remove", "pt:leave", "pt:conclude"]);
        // Slot buttons are sorted by name regardless of case
        assert_eq!(ids[1], vec!["pt:signup:DPS", "pt:signup:healer", "pt:signup:Tank"]);
    }

    #[test]
    fn test_full_event_fits_in_five_rows() {
        let mut event = event();
        while event.slots.len() < crate::models::MAX_SLOTS {
            let name = format!("Extra {}", event.slots.len());
            event.add_slot(OWNER, &name).unwrap();
        }
        let (_, rows) = render_event(&event);
        assert_eq!(rows.len(), 5);
        assert!(custom_ids(&rows).iter().all(|row| row.len() <= BUTTONS_PER_ROW));
    }

    #[test]
    fn test_largest_event_fits_embed_limits() {
        use crate::models::event::{MAX_DESCRIPTION_LEN, MAX_SCHEDULE_LEN, MAX_TITLE_LEN};
        use crate::models::{MAX_NAME_LEN, MAX_SLOTS};

        let roles: Vec<String> = (0..MAX_SLOTS)
            .map(|i| format!("{:r>width$}", i, width = MAX_NAME_LEN))
            .collect();
        let mut event = Event::new(
            &"T".repeat(MAX_TITLE_LEN),
            &"S".repeat(MAX_SCHEDULE_LEN),
            &"D".repeat(MAX_DESCRIPTION_LEN),
            OWNER,
            "Owner",
            None,
            ChannelId::new(3),
            &roles,
        )
        .unwrap();
        for (i, role) in roles.iter().enumerate() {
            event.signup(UserId::new(u64::MAX - i as u64), role).unwrap();
        }

        let (embed, _) = render_event(&event);
        let embed: Value = serde_json::to_value(&embed).unwrap();
        assert!(embed["title"].as_str().unwrap().chars().count() <= 256);
        assert!(embed["description"].as_str().unwrap().chars().count() <= 4096);
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), MAX_SLOTS);
        let total: usize = fields
            .iter()
            .map(|f| f["name"].as_str().unwrap().len() + f["value"].as_str().unwrap().len())
            .sum();
        assert!(total < 6000);
    }

    #[test]
    fn test_closed_event_has_no_components() {
        let mut event = event();
        event.conclude(OWNER, Conclusion::Cancelled).unwrap();
        let (embed, rows) = render_event(&event);
        assert!(rows.is_empty());

        let embed: Value = serde_json::to_value(&embed).unwrap();
        assert!(embed["description"].as_str().unwrap().contains("cancelled"));
    }

    #[test]
    fn test_report_rendering() {
        let members = [UserId::new(10), UserId::new(11), UserId::new(12)];
        let mut report = Report::compute("Avalon", OWNER, &members, 1_000_000, 7).unwrap();
        report.toggle_paid(OWNER, members[1]).unwrap();

        let (embed, rows) = render_report(&report);
        let embed: Value = serde_json::to_value(&embed).unwrap();
        let description = embed["description"].as_str().unwrap();
        assert!(description.contains("(1/3 paid)"));
        assert!(description.contains("<@11> - ✅ paid"));
        assert!(description.contains("<@10> - ⏳ pending"));

        let fields = embed["fields"].as_array().unwrap();
        let field = |name: &str| {
            fields
                .iter()
                .find(|f| f["name"] == name)
                .map(|f| f["value"].as_str().unwrap().to_string())
        };
        assert_eq!(field("Loot per person").as_deref(), Some("333,333"));
        assert_eq!(field("Repair per person").as_deref(), Some("2"));
        assert_eq!(field("Net per person").as_deref(), Some("333,331"));
        assert_eq!(field("Not split (rounding)").as_deref(), Some("Loot: 1 · Repair: 1"));

        assert_eq!(custom_ids(&rows), vec![vec!["pt:paid".to_string()]]);
        let picker = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(picker["components"][0]["max_values"], 3);
    }

    #[test]
    fn test_settled_report_has_no_picker() {
        let members = [UserId::new(10), UserId::new(11)];
        let mut report = Report::compute("Avalon", OWNER, &members, 100, 0).unwrap();
        for member in members {
            report.toggle_paid(OWNER, member).unwrap();
        }

        let (embed, rows) = render_report(&report);
        assert!(rows.is_empty());
        let embed: Value = serde_json::to_value(&embed).unwrap();
        assert_eq!(embed["footer"]["text"], "Everyone has been paid.");
    }
}
