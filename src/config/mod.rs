pub mod bot_config;
pub mod store_location;

pub use bot_config::BotConfig;
pub use store_location::StoreLocation;
