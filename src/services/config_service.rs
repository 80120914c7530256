//! services/config_service.rs
//! Configuration Gateway sobre SQLite: una sola fila (id = 1) en `bot_config`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::config_model::{BotConfig, UpdateBotConfig};
use crate::services::capabilities::{ConfigError, ConfigGateway};

const MAX_CHANNEL_NAME_CHARS: usize = 100;
const MAX_TARGET_CHANNELS: usize = 10;

#[derive(Debug, sqlx::FromRow)]
struct ConfigRow {
    source_channel: String,
    source_channel_id: Option<String>,
    target_channels: String,
    is_enabled: i64,
    updated_at: String,
}

impl TryFrom<ConfigRow> for BotConfig {
    type Error = anyhow::Error;

    fn try_from(row: ConfigRow) -> Result<Self> {
        let target_channels: Vec<String> = serde_json::from_str(&row.target_channels)
            .context("target_channels no es un arreglo JSON válido")?;
        Ok(BotConfig {
            source_channel: row.source_channel,
            source_channel_id: row.source_channel_id,
            target_channels,
            is_enabled: row.is_enabled != 0,
            updated_at: row.updated_at.parse().ok(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ConfigService {
    db_pool: Pool<Sqlite>,
}

impl ConfigService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        ConfigService { db_pool }
    }

    /// Corre migraciones con sqlx (bot_config y message_logs)
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Fallo en migraciones del relay")?;
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<BotConfig>> {
        let row = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT source_channel, source_channel_id, target_channels,
                   is_enabled, updated_at
            FROM bot_config
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al leer bot_config")?;

        row.map(BotConfig::try_from).transpose()
    }
}

/// Valida un cambio parcial. El campo se reporta en camelCase, como lo ve el dashboard.
pub fn validate_update(changes: &UpdateBotConfig) -> Result<(), ConfigError> {
    if let Some(source) = &changes.source_channel {
        if source.trim().is_empty() {
            return Err(ConfigError::validation(
                "sourceChannel",
                "Source channel is required",
            ));
        }
        if source.chars().count() > MAX_CHANNEL_NAME_CHARS {
            return Err(ConfigError::validation(
                "sourceChannel",
                format!("Source channel must be at most {MAX_CHANNEL_NAME_CHARS} characters"),
            ));
        }
    }

    if let Some(Some(id)) = &changes.source_channel_id {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::validation(
                "sourceChannelId",
                "Source channel id must be a numeric channel id",
            ));
        }
    }

    if let Some(targets) = &changes.target_channels {
        if targets.len() > MAX_TARGET_CHANNELS {
            return Err(ConfigError::validation(
                "targetChannels",
                format!("At most {MAX_TARGET_CHANNELS} target channels are allowed"),
            ));
        }
        if let Some(idx) = targets
            .iter()
            .position(|t| t.chars().count() > MAX_CHANNEL_NAME_CHARS)
        {
            return Err(ConfigError::validation(
                &format!("targetChannels.{idx}"),
                format!("Target channel must be at most {MAX_CHANNEL_NAME_CHARS} characters"),
            ));
        }
    }

    Ok(())
}

#[async_trait]
impl ConfigGateway for ConfigService {
    async fn get(&self) -> Result<BotConfig, ConfigError> {
        let defaults = BotConfig::default();
        let targets_json = serde_json::to_string(&defaults.target_channels)
            .context("No se pudo serializar target_channels")?;
        let now = Utc::now().to_rfc3339();

        // INSERT OR IGNORE: si dos llamadas concurrentes crean la fila, queda una sola.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO bot_config (
                id, source_channel, source_channel_id, target_channels,
                is_enabled, updated_at
            )
            VALUES (1, ?1, NULL, ?2, ?3, ?4)
            "#,
        )
        .bind(&defaults.source_channel)
        .bind(&targets_json)
        .bind(i64::from(defaults.is_enabled))
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al crear configuración por defecto")?;

        self.fetch().await?.ok_or(ConfigError::NotInitialized)
    }

    async fn update(&self, changes: UpdateBotConfig) -> Result<BotConfig, ConfigError> {
        validate_update(&changes)?;

        let id_given = changes.source_channel_id.is_some();
        let source_channel_id = changes.source_channel_id.flatten();

        let source_channel = changes.source_channel.map(|s| s.trim().to_string());
        let targets_json = changes
            .target_channels
            .map(|targets| {
                let trimmed: Vec<String> = targets.iter().map(|t| t.trim().to_string()).collect();
                serde_json::to_string(&trimmed)
            })
            .transpose()
            .context("No se pudo serializar target_channels")?;
        let now = Utc::now().to_rfc3339();

        // Un sourceChannelId presente manda (null lo libera). Si no viene y
        // cambia el nombre del canal origen, se borra el id fijado para
        // volver a comparar por nombre.
        let result = sqlx::query(
            r#"
            UPDATE bot_config
            SET
                source_channel_id = CASE
                    WHEN ?6 = 1 THEN ?2
                    WHEN ?1 IS NOT NULL AND ?1 IS NOT source_channel THEN NULL
                    ELSE source_channel_id
                END,
                source_channel = COALESCE(?1, source_channel),
                target_channels = COALESCE(?3, target_channels),
                is_enabled = COALESCE(?4, is_enabled),
                updated_at = ?5
            WHERE id = 1
            "#,
        )
        .bind(source_channel)
        .bind(source_channel_id)
        .bind(targets_json)
        .bind(changes.is_enabled.map(i64::from))
        .bind(now)
        .bind(i64::from(id_given))
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar bot_config")?;

        if result.rows_affected() == 0 {
            return Err(ConfigError::NotInitialized);
        }

        self.fetch().await?.ok_or(ConfigError::NotInitialized)
    }
}
