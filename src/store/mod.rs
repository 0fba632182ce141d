//! Template persistence.
//!
//! Templates are the only data that must survive a restart. Backends are
//! interchangeable behind [`TemplateStore`] and selected by the
//! `TEMPLATE_STORE` connection string.

use async_trait::async_trait;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use tracing::info;

use crate::config::StoreLocation;
use crate::error::Result;
use crate::models::Template;

pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use json_file::JsonTemplateStore;
pub use memory::MemoryTemplateStore;
pub use sqlite::SqliteTemplateStore;

/// Whether an upsert created a new template or replaced one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Guild-scoped template repository. Names are matched case-insensitively.
#[async_trait]
pub trait TemplateStore: Send + Sync + 'static {
    /// Insert or replace a template
    async fn upsert(&self, guild: GuildId, template: Template) -> Result<Upserted>;

    /// Fetch a template by name
    async fn get(&self, guild: GuildId, name: &str) -> Result<Option<Template>>;

    /// All templates of a guild, sorted by name
    async fn list(&self, guild: GuildId) -> Result<Vec<Template>>;

    /// Delete a template; returns false if it did not exist
    async fn delete(&self, guild: GuildId, name: &str) -> Result<bool>;
}

/// Shared template store type
pub type SharedTemplateStore = Arc<dyn TemplateStore>;

/// Open the backend named by `location`
pub async fn open_template_store(location: &StoreLocation) -> Result<SharedTemplateStore> {
    info!("Opening template store at {}", location);
    let store: SharedTemplateStore = match location {
        StoreLocation::Json(path) => Arc::new(JsonTemplateStore::open(path.clone()).await?),
        StoreLocation::Sqlite(path) => Arc::new(SqliteTemplateStore::open(path.clone()).await?),
        StoreLocation::Memory => Arc::new(MemoryTemplateStore::new()),
    };
    Ok(store)
}

/// Sort templates for listing
fn sort_by_name(templates: &mut [Template]) {
    templates.sort_by_key(|t| t.key());
}
