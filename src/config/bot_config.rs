use poise::serenity_prelude::ChannelId;

use super::StoreLocation;
use crate::error::{BotError, Result};

/// Runtime configuration, read once from the environment at startup.
///
/// Any missing or malformed required value aborts startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token
    pub token: String,
    /// Where templates live
    pub template_store: StoreLocation,
    /// Channel receiving payout reports; the event channel is used when unset
    pub report_channel: Option<ChannelId>,
    /// Directory for data files (default template store)
    pub data_path: String,
    /// Directory for runtime state (event snapshot)
    pub state_path: String,
    /// Keep-alive HTTP port, `None` when disabled
    pub keep_alive_port: Option<u16>,
}

impl BotConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token = get("DISCORD_TOKEN").ok_or_else(|| BotError::MissingEnv {
            name: "DISCORD_TOKEN".to_string(),
        })?;

        let data_path = get("DATA_PATH").unwrap_or_else(|| "data".to_string());
        let state_path = get("STATE_PATH").unwrap_or_else(|| "state".to_string());

        let template_store = match get("TEMPLATE_STORE") {
            Some(raw) => StoreLocation::parse(&raw)?,
            None => StoreLocation::default_in(&data_path),
        };

        let report_channel = match get("REPORT_CHANNEL_ID") {
            Some(raw) => Some(parse_snowflake("REPORT_CHANNEL_ID", &raw).map(ChannelId::new)?),
            None => None,
        };

        let keep_alive_port = match get("KEEP_ALIVE_PORT") {
            Some(raw) => {
                let port: u16 = raw.trim().parse().map_err(|_| BotError::ConfigValidation {
                    message: format!("KEEP_ALIVE_PORT '{}' is not a valid port", raw),
                })?;
                (port != 0).then_some(port)
            }
            None => Some(8080),
        };

        Ok(Self {
            token: token.trim().to_string(),
            template_store,
            report_channel,
            data_path,
            state_path,
            keep_alive_port,
        })
    }

    /// Path of the event registry snapshot
    pub fn events_state_file(&self) -> String {
        format!("{}/events.json", self.state_path)
    }
}

fn parse_snowflake(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| BotError::ConfigValidation {
            message: format!("{} '{}' is not a valid Discord id", name, raw),
        })
}
