use std::fmt;
use std::path::PathBuf;

use crate::error::{BotError, Result};

/// Where templates are persisted, parsed from a `TEMPLATE_STORE` connection string.
///
/// Accepted forms:
/// - `json://data/templates.json`
/// - `sqlite://data/templates.db`
/// - `memory://`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Json(PathBuf),
    Sqlite(PathBuf),
    Memory,
}

impl StoreLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (scheme, rest) = raw.split_once("://").ok_or_else(|| BotError::ConfigValidation {
            message: format!("TEMPLATE_STORE '{}' is missing a scheme (json://, sqlite://, memory://)", raw),
        })?;

        match scheme.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreLocation::Memory),
            "json" | "sqlite" if rest.is_empty() => Err(BotError::ConfigValidation {
                message: format!("TEMPLATE_STORE '{}' has no path", raw),
            }),
            "json" => Ok(StoreLocation::Json(PathBuf::from(rest))),
            "sqlite" => Ok(StoreLocation::Sqlite(PathBuf::from(rest))),
            other => Err(BotError::ConfigValidation {
                message: format!("Unsupported TEMPLATE_STORE scheme '{}'", other),
            }),
        }
    }

    /// Default location inside the data directory
    pub fn default_in(data_path: &str) -> Self {
        StoreLocation::Json(PathBuf::from(format!("{}/templates.json", data_path)))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Json(path) => write!(f, "json://{}", path.display()),
            StoreLocation::Sqlite(path) => write!(f, "sqlite://{}", path.display()),
            StoreLocation::Memory => write!(f, "memory://"),
        }
    }
}
