use crate::error::{ActionError, ActionResult};

/// Longest slot or template name accepted. Names are embedded in component
/// custom ids, which Discord caps at 100 characters.
pub const MAX_NAME_LEN: usize = 40;

/// Trim a user supplied name and check it fits in a custom id
pub fn normalize_name(raw: &str) -> ActionResult<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.is_empty() {
        return Err(ActionError::InvalidName {
            reason: "the name cannot be empty".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ActionError::InvalidName {
            reason: format!("'{}' is longer than {} characters", name, MAX_NAME_LEN),
        });
    }
    if name.contains(':') {
        return Err(ActionError::InvalidName {
            reason: format!("'{}' contains ':'", name),
        });
    }

    Ok(name)
}

/// Case-insensitive name comparison
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  DPS   Range ").unwrap(), "DPS Range");
        assert!(normalize_name("   ").is_err());
        assert!(normalize_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(normalize_name("pt:signup").is_err());
    }

    #[test]
    fn test_same_name() {
        assert!(same_name("Healer", "hEALER"));
        assert!(!same_name("Healer", "Healer 2"));
    }
}
