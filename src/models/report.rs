//! Payout report produced when an event is completed.
//!
//! Loot and repair totals are split evenly with integer floor division.
//! Remainders are dropped on purpose (amounts are whole silver) and the
//! dropped amount is kept visible on the report.

use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserId,
    pub paid: bool,
}

/// Immutable payout snapshot; only the `paid` flags change afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub event_title: String,
    pub owner: UserId,
    pub loot_total: u64,
    pub repair_total: u64,
    pub loot_per_person: u64,
    pub repair_per_person: u64,
    pub net_per_person: i64,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn compute(
        event_title: &str,
        owner: UserId,
        participants: &[UserId],
        loot_total: u64,
        repair_total: u64,
    ) -> ActionResult<Self> {
        let mut unique: Vec<UserId> = Vec::with_capacity(participants.len());
        for user in participants {
            if !unique.contains(user) {
                unique.push(*user);
            }
        }

        if unique.is_empty() {
            return Err(ActionError::NoParticipants);
        }

        let n = unique.len() as u64;
        let loot_per_person = loot_total / n;
        let repair_per_person = repair_total / n;
        let net_per_person = to_signed(loot_per_person).saturating_sub(to_signed(repair_per_person));

        Ok(Self {
            event_title: event_title.to_string(),
            owner,
            loot_total,
            repair_total,
            loot_per_person,
            repair_per_person,
            net_per_person,
            participants: unique
                .into_iter()
                .map(|user| Participant { user, paid: false })
                .collect(),
            created_at: Utc::now(),
        })
    }

    /// Loot left over by the floor division
    pub fn loot_remainder(&self) -> u64 {
        self.loot_total % self.participants.len().max(1) as u64
    }

    /// Repair cost left over by the floor division
    pub fn repair_remainder(&self) -> u64 {
        self.repair_total % self.participants.len().max(1) as u64
    }

    /// Flip a participant's paid flag and return the new value
    pub fn toggle_paid(&mut self, requester: UserId, user: UserId) -> ActionResult<bool> {
        self.ensure_owner(requester)?;

        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user == user)
            .ok_or_else(|| ActionError::not_found("Participant"))?;
        participant.paid = !participant.paid;
        Ok(participant.paid)
    }

    /// Only the event creator manages payments
    pub fn ensure_owner(&self, requester: UserId) -> ActionResult<()> {
        if requester != self.owner {
            return Err(ActionError::unauthorized(
                "the event creator can mark payments",
            ));
        }
        Ok(())
    }

    pub fn paid_count(&self) -> usize {
        self.participants.iter().filter(|p| p.paid).count()
    }

    pub fn all_paid(&self) -> bool {
        self.paid_count() == self.participants.len()
    }
}

fn to_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Parse a loot or repair amount typed into a form.
///
/// Accepts thousands separators (`1.000.000`, `1,000,000`, `1 000 000`,
/// `1_000_000`) between full groups of three digits, and `k`/`m` suffixes,
/// where a single `.` or `,` before the suffix is a decimal point (`1.5k` is
/// 1500). Anything else, such as `1.5` or `12,50`, is rejected.
pub fn parse_amount(input: &str) -> ActionResult<u64> {
    let trimmed = input.trim();
    let invalid = || ActionError::InvalidNumber {
        input: trimmed.to_string(),
    };

    let lowered = trimmed.to_lowercase();
    let (body, multiplier) = if let Some(body) = lowered.strip_suffix('m') {
        (body, 1_000_000u64)
    } else if let Some(body) = lowered.strip_suffix('k') {
        (body, 1_000u64)
    } else {
        (lowered.as_str(), 1u64)
    };

    let value = if multiplier == 1 {
        parse_grouped(body).ok_or_else(invalid)?
    } else {
        let body: String = body
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect();
        let (whole, fraction) = match body.find(['.', ',']) {
            Some(pos) => (&body[..pos], &body[pos + 1..]),
            None => (body.as_str(), ""),
        };
        let scale = multiplier.to_string().len() - 1;
        if fraction.len() > scale || (whole.is_empty() && fraction.is_empty()) {
            return Err(invalid());
        }
        let whole = if whole.is_empty() { 0 } else { parse_digits(whole).ok_or_else(invalid)? };
        let padded = format!("{:0<width$}", fraction, width = scale);
        let fraction = parse_digits(&padded).ok_or_else(invalid)?;
        whole
            .checked_mul(multiplier)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(invalid)?
    };

    if value > i64::MAX as u64 {
        return Err(invalid());
    }
    Ok(value)
}

/// Plain digits, or 1-3 leading digits followed by separated groups of three
fn parse_grouped(body: &str) -> Option<u64> {
    let groups: Vec<&str> = body
        .split(|c: char| matches!(c, '.' | ',' | '_') || c.is_whitespace())
        .collect();
    let (first, rest) = groups.split_first()?;
    if !rest.is_empty() && !(1..=3).contains(&first.len()) {
        return None;
    }
    if rest.iter().any(|group| group.len() != 3) {
        return None;
    }
    parse_digits(&groups.concat())
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Format an amount with `,` thousands separators
pub fn format_amount(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: UserId = UserId::new(1);

    fn users(n: u64) -> Vec<UserId> {
        (10..10 + n).map(UserId::new).collect()
    }

    #[test]
    fn test_even_split() {
        let report = Report::compute("Avalon", OWNER, &users(4), 1_000_000, 200_000).unwrap();
        assert_eq!(report.loot_per_person, 250_000);
        assert_eq!(report.repair_per_person, 50_000);
        assert_eq!(report.net_per_person, 200_000);
        assert_eq!(report.loot_remainder(), 0);
    }

    #[test]
    fn test_floor_division_drops_remainder() {
        let report = Report::compute("Avalon", OWNER, &users(3), 7, 0).unwrap();
        assert_eq!(report.loot_per_person, 2);
        assert_eq!(report.loot_remainder(), 1);
        assert_eq!(report.repair_per_person, 0);
    }

    #[test]
    fn test_net_can_be_negative() {
        let report = Report::compute("Wipe", OWNER, &users(2), 100, 300).unwrap();
        assert_eq!(report.net_per_person, -100);
    }

    #[test]
    fn test_no_participants() {
        assert_eq!(
            Report::compute("Empty", OWNER, &[], 100, 0).unwrap_err(),
            ActionError::NoParticipants
        );
    }

    #[test]
    fn test_duplicates_counted_once() {
        let alice = UserId::new(2);
        let report = Report::compute("Dup", OWNER, &[alice, alice, UserId::new(3)], 10, 0).unwrap();
        assert_eq!(report.participants.len(), 2);
        assert_eq!(report.loot_per_person, 5);
    }

    #[test]
    fn test_toggle_paid_keeps_totals() {
        let members = users(2);
        let mut report = Report::compute("Avalon", OWNER, &members, 1_000, 100).unwrap();
        let snapshot = (report.loot_per_person, report.repair_per_person, report.net_per_person);

        assert!(report.toggle_paid(OWNER, members[0]).unwrap());
        assert_eq!(report.paid_count(), 1);
        assert!(!report.all_paid());
        assert!(!report.toggle_paid(OWNER, members[0]).unwrap());

        assert!(matches!(
            report.toggle_paid(members[1], members[1]),
            Err(ActionError::Unauthorized { .. })
        ));
        assert!(matches!(
            report.toggle_paid(OWNER, UserId::new(999)),
            Err(ActionError::NotFound { .. })
        ));

        report.toggle_paid(OWNER, members[0]).unwrap();
        report.toggle_paid(OWNER, members[1]).unwrap();
        assert!(report.all_paid());
        assert_eq!(
            snapshot,
            (report.loot_per_person, report.repair_per_person, report.net_per_person)
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000000").unwrap(), 1_000_000);
        assert_eq!(parse_amount(" 1.000.000 ").unwrap(), 1_000_000);
        assert_eq!(parse_amount("1,000,000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("1 000 000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("250k").unwrap(), 250_000);
        assert_eq!(parse_amount("1.5k").unwrap(), 1_500);
        assert_eq!(parse_amount("2,25M").unwrap(), 2_250_000);
        assert_eq!(parse_amount("0").unwrap(), 0);
        assert_eq!(parse_amount("12.500").unwrap(), 12_500);
        assert_eq!(parse_amount("1_000_000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("1 500k").unwrap(), 1_500_000);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        for input in [
            "",
            "abc",
            "-5",
            "12x",
            "k",
            "1.2345k",
            "99999999999999999999",
            "1.2.3k",
            "1.5",
            "12,50",
            "1,000.5",
            "1000,000",
            "1..000",
            ",000",
        ] {
            assert_eq!(
                parse_amount(input),
                Err(ActionError::InvalidNumber {
                    input: input.to_string()
                }),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(250_000), "250,000");
        assert_eq!(format_amount(-1_234_567), "-1,234,567");
    }
}
