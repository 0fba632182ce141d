use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::MAX_SLOTS;
use super::names::{normalize_name, same_name};
use crate::error::{ActionError, ActionResult};

/// A named, reusable list of slot names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub roles: Vec<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Build a template from a name and a comma-separated role list
    pub fn parse(name: &str, roles: &str) -> ActionResult<Self> {
        Ok(Self {
            name: normalize_name(name)?,
            roles: parse_role_list(roles)?,
            updated_at: Utc::now(),
        })
    }

    /// Lookup key; template names are unique per guild regardless of case
    pub fn key(&self) -> String {
        template_key(&self.name)
    }
}

pub fn template_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split `"Tank, Healer, DPS"` into role names
pub fn parse_role_list(input: &str) -> ActionResult<Vec<String>> {
    let mut roles: Vec<String> = Vec::new();

    for part in input.split([',', '\n', ';']) {
        if part.trim().is_empty() {
            continue;
        }
        let role = normalize_name(part)?;
        if roles.iter().any(|r| same_name(r, &role)) {
            return Err(ActionError::DuplicateSlot { name: role });
        }
        roles.push(role);
    }

    if roles.is_empty() {
        return Err(ActionError::InvalidName {
            reason: "a template needs at least one role".to_string(),
        });
    }
    if roles.len() > MAX_SLOTS {
        return Err(ActionError::TooManySlots { max: MAX_SLOTS });
    }

    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let template = Template::parse(" ZvZ  Group ", "Tank, Healer,,  DPS Range ;Scout").unwrap();
        assert_eq!(template.name, "ZvZ Group");
        assert_eq!(template.key(), "zvz group");
        assert_eq!(template.roles, vec!["Tank", "Healer", "DPS Range", "Scout"]);
    }

    #[test]
    fn test_parse_role_list_errors() {
        assert!(matches!(parse_role_list(" , ,"), Err(ActionError::InvalidName { .. })));
        assert_eq!(
            parse_role_list("Tank, tank").unwrap_err(),
            ActionError::DuplicateSlot { name: "tank".to_string() }
        );

        let too_many = (0..=MAX_SLOTS).map(|i| format!("R{}", i)).collect::<Vec<_>>().join(",");
        assert_eq!(
            parse_role_list(&too_many).unwrap_err(),
            ActionError::TooManySlots { max: MAX_SLOTS }
        );
    }

    #[test]
    fn test_template_json_shape() {
        let json = r#"{"name": "Avalon", "roles": ["Tank", "Healer"]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.roles.len(), 2);
    }
}
