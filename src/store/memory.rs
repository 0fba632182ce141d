use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude::GuildId;

use super::{sort_by_name, TemplateStore, Upserted};
use crate::error::Result;
use crate::models::{template_key, Template};

/// Process-local templates, lost on restart
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: DashMap<(GuildId, String), Template>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn upsert(&self, guild: GuildId, template: Template) -> Result<Upserted> {
        let previous = self.templates.insert((guild, template.key()), template);
        Ok(if previous.is_some() {
            Upserted::Updated
        } else {
            Upserted::Created
        })
    }

    async fn get(&self, guild: GuildId, name: &str) -> Result<Option<Template>> {
        Ok(self
            .templates
            .get(&(guild, template_key(name)))
            .map(|t| t.value().clone()))
    }

    async fn list(&self, guild: GuildId) -> Result<Vec<Template>> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .filter(|entry| entry.key().0 == guild)
            .map(|entry| entry.value().clone())
            .collect();
        sort_by_name(&mut templates);
        Ok(templates)
    }

    async fn delete(&self, guild: GuildId, name: &str) -> Result<bool> {
        Ok(self.templates.remove(&(guild, template_key(name))).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_contract() {
        crate::store::contract::run(&MemoryTemplateStore::new()).await;
    }
}
