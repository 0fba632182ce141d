use thiserror::Error;

/// Rejections of a single user action. These never escape the interaction that
/// triggered them; each one is turned into an ephemeral reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Only {who} can do that.")]
    Unauthorized { who: String },

    #[error("The slot '{name}' already exists.")]
    DuplicateSlot { name: String },

    #[error("{what} not found.")]
    NotFound { what: String },

    #[error("The slot **{name}** is already taken.")]
    AlreadyOccupied { name: String },

    #[error("You are already signed up as **{name}**.")]
    AlreadySignedUp { name: String },

    #[error("Nobody is signed up, so there is nothing to split.")]
    NoParticipants,

    #[error("'{input}' is not a valid amount.")]
    InvalidNumber { input: String },

    #[error("The event changed in the meantime ({reason}). Please try again.")]
    StaleState { reason: String },

    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    #[error("An event can hold at most {max} slots.")]
    TooManySlots { max: usize },
}

impl ActionError {
    pub fn unauthorized(who: impl Into<String>) -> Self {
        ActionError::Unauthorized { who: who.into() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ActionError::NotFound { what: what.into() }
    }

    pub fn stale(reason: impl Into<String>) -> Self {
        ActionError::StaleState {
            reason: reason.into(),
        }
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Missing required environment variable {name}")]
    MissingEnv { name: String },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    #[error("Failed to parse '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Template store errors
    #[error("Template store error: {message}")]
    Store { message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for BotError {
    fn from(err: rusqlite::Error) -> Self {
        BotError::Store {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_messages() {
        let err = ActionError::AlreadyOccupied {
            name: "Tank".to_string(),
        };
        assert_eq!(err.to_string(), "The slot **Tank** is already taken.");

        let err = ActionError::not_found("Slot 'Healer'");
        assert_eq!(err.to_string(), "Slot 'Healer' not found.");
    }
}
