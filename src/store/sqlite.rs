use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::GuildId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;

use super::{TemplateStore, Upserted};
use crate::error::{BotError, Result};
use crate::models::{template_key, Template};

/// Schema version stored in `PRAGMA user_version`
const SCHEMA_VERSION: i64 = 1;

/// Templates in a relational table, one row per `(guild, name)`.
///
/// rusqlite is blocking, so every call runs on the blocking thread pool.
pub struct SqliteTemplateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTemplateStore {
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BotError::StateSave {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            init_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(join_error)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(join_error)?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS templates (
            guild_id INTEGER NOT NULL,
            name_key TEXT NOT NULL,
            name TEXT NOT NULL,
            roles TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (guild_id, name_key)
        );
        ",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> BotError {
    BotError::Internal {
        message: format!("template store task failed: {}", err),
    }
}

fn guild_key(guild: GuildId) -> i64 {
    guild.get() as i64
}

fn row_to_template(name: String, roles: String, updated_at: String) -> Result<Template> {
    let roles: Vec<String> = serde_json::from_str(&roles).map_err(|e| BotError::Store {
        message: format!("corrupt roles for template '{}': {}", name, e),
    })?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Template {
        name,
        roles,
        updated_at,
    })
}

#[async_trait]
impl TemplateStore for SqliteTemplateStore {
    async fn upsert(&self, guild: GuildId, template: Template) -> Result<Upserted> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let key = template.key();
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM templates WHERE guild_id = ?1 AND name_key = ?2)",
                params![guild_key(guild), key],
                |row| row.get(0),
            )?;

            let roles = serde_json::to_string(&template.roles)?;
            tx.execute(
                "INSERT INTO templates (guild_id, name_key, name, roles, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(guild_id, name_key) DO UPDATE SET
                    name = excluded.name,
                    roles = excluded.roles,
                    updated_at = excluded.updated_at",
                params![
                    guild_key(guild),
                    key,
                    template.name,
                    roles,
                    template.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                ],
            )?;
            tx.commit()?;

            Ok(if exists {
                Upserted::Updated
            } else {
                Upserted::Created
            })
        })
        .await
    }

    async fn get(&self, guild: GuildId, name: &str) -> Result<Option<Template>> {
        let key = template_key(name);
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT name, roles, updated_at FROM templates
                     WHERE guild_id = ?1 AND name_key = ?2",
                    params![guild_key(guild), key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;
            row.map(|(name, roles, updated_at)| row_to_template(name, roles, updated_at))
                .transpose()
        })
        .await
    }

    async fn list(&self, guild: GuildId) -> Result<Vec<Template>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, roles, updated_at FROM templates
                 WHERE guild_id = ?1 ORDER BY name_key",
            )?;
            let rows = stmt.query_map(params![guild_key(guild)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut templates = Vec::new();
            for row in rows {
                let (name, roles, updated_at) = row?;
                templates.push(row_to_template(name, roles, updated_at)?);
            }
            Ok(templates)
        })
        .await
    }

    async fn delete(&self, guild: GuildId, name: &str) -> Result<bool> {
        let key = template_key(name);
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM templates WHERE guild_id = ?1 AND name_key = ?2",
                params![guild_key(guild), key],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
