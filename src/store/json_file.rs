use async_trait::async_trait;
use poise::serenity_prelude::GuildId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

use super::{sort_by_name, TemplateStore, Upserted};
use crate::error::{BotError, Result};
use crate::models::{template_key, Template};

/// Templates kept in a single JSON document.
///
/// The file is read on every call and rewritten atomically on every change.
pub struct JsonTemplateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// On-disk layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TemplateFile {
    /// Schema version
    #[serde(default)]
    version: u32,

    /// Guild ID -> template key -> template
    #[serde(default)]
    guilds: HashMap<String, BTreeMap<String, Template>>,
}

impl JsonTemplateStore {
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BotError::StateSave {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // Fail at startup rather than on first use if the file is corrupt
        store.read().await?;
        Ok(store)
    }

    async fn read(&self) -> Result<TemplateFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                path: self.path.display().to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TemplateFile::default()),
            Err(e) => Err(BotError::StateLoad {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    async fn write(&self, file: &mut TemplateFile) -> Result<()> {
        file.version = 1;
        let content = serde_json::to_string_pretty(file)?;
        let path = self.path.display().to_string();

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StateSave { path, source: e })?;

        debug!("Wrote template file {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for JsonTemplateStore {
    async fn upsert(&self, guild: GuildId, template: Template) -> Result<Upserted> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;

        let previous = file
            .guilds
            .entry(guild.to_string())
            .or_default()
            .insert(template.key(), template);
        self.write(&mut file).await?;

        Ok(if previous.is_some() {
            Upserted::Updated
        } else {
            Upserted::Created
        })
    }

    async fn get(&self, guild: GuildId, name: &str) -> Result<Option<Template>> {
        let file = self.read().await?;
        Ok(file
            .guilds
            .get(&guild.to_string())
            .and_then(|templates| templates.get(&template_key(name)))
            .cloned())
    }

    async fn list(&self, guild: GuildId) -> Result<Vec<Template>> {
        let file = self.read().await?;
        let mut templates: Vec<Template> = file
            .guilds
            .get(&guild.to_string())
            .map(|templates| templates.values().cloned().collect())
            .unwrap_or_default();
        sort_by_name(&mut templates);
        Ok(templates)
    }

    async fn delete(&self, guild: GuildId, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;

        let removed = file
            .guilds
            .get_mut(&guild.to_string())
            .and_then(|templates| templates.remove(&template_key(name)))
            .is_some();
        if removed {
            self.write(&mut file).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::open(dir.path().join("nested/templates.json"))
            .await
            .unwrap();
        crate::store::contract::run(&store).await;
    }

    #[tokio::test]
    async fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let guild = GuildId::new(5);

        {
            let store = JsonTemplateStore::open(path.clone()).await.unwrap();
            store
                .upsert(guild, Template::parse("Gank", "Tank, DPS").unwrap())
                .await
                .unwrap();
        }

        let store = JsonTemplateStore::open(path).await.unwrap();
        let template = store.get(guild, "gank").await.unwrap().unwrap();
        assert_eq!(template.roles, vec!["Tank", "DPS"]);
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(matches!(
            JsonTemplateStore::open(path).await,
            Err(BotError::ConfigParse { .. })
        ));
    }
}
