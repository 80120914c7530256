//! services/log_service.rs
//! Log store sobre SQLite (`message_logs`): alta de intentos de reenvío,
//! listado del más nuevo al más viejo y resumen para el dashboard.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{Pool, Sqlite};

use crate::models::relay_model::{RelayAttempt, RelayStats, RelayStatus};
use crate::services::capabilities::LogStore;

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: String,
    content: String,
    source_guild: String,
    target_guilds: String,
    failed_targets: String,
    attachment_count: i64,
    status: String,
    created_at: String,
}

impl TryFrom<LogRow> for RelayAttempt {
    type Error = anyhow::Error;

    fn try_from(row: LogRow) -> Result<Self> {
        Ok(RelayAttempt {
            destinations_reached: serde_json::from_str(&row.target_guilds)
                .with_context(|| format!("target_guilds inválido en log {}", row.id))?,
            destinations_failed: serde_json::from_str(&row.failed_targets)
                .with_context(|| format!("failed_targets inválido en log {}", row.id))?,
            attachment_count: u32::try_from(row.attachment_count).unwrap_or_default(),
            status: row.status.parse()?,
            created_at: row
                .created_at
                .parse()
                .with_context(|| format!("created_at inválido en log {}", row.id))?,
            id: row.id,
            content: row.content,
            source_server_name: row.source_guild,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LogService {
    db_pool: Pool<Sqlite>,
}

impl LogService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        LogService { db_pool }
    }

    /// Resumen de los últimos `limit` intentos.
    pub async fn stats(&self, limit: u32) -> Result<RelayStats> {
        let attempts = self.list(limit).await?;
        Ok(summarize(&attempts))
    }
}

pub fn summarize(attempts: &[RelayAttempt]) -> RelayStats {
    let mut stats = RelayStats {
        total: attempts.len() as u64,
        ..Default::default()
    };
    for attempt in attempts {
        match attempt.status {
            RelayStatus::Success => stats.success += 1,
            RelayStatus::Partial => stats.partial += 1,
            RelayStatus::Failed => stats.failed += 1,
        }
    }
    if stats.total > 0 {
        stats.success_rate = (stats.success * 100 + stats.total / 2) / stats.total;
    }
    stats
}

#[async_trait]
impl LogStore for LogService {
    async fn append(&self, attempt: RelayAttempt) -> Result<RelayAttempt> {
        let target_guilds = serde_json::to_string(&attempt.destinations_reached)?;
        let failed_targets = serde_json::to_string(&attempt.destinations_failed)?;
        // Ancho fijo (micros + Z) para que el orden por texto sea el orden temporal.
        let created_at = attempt
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO message_logs (
                id, content, source_guild, target_guilds, failed_targets,
                attachment_count, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.content)
        .bind(&attempt.source_server_name)
        .bind(target_guilds)
        .bind(failed_targets)
        .bind(i64::from(attempt.attachment_count))
        .bind(attempt.status.as_str())
        .bind(created_at)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar message_log")?;

        Ok(attempt)
    }

    async fn list(&self, limit: u32) -> Result<Vec<RelayAttempt>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, content, source_guild, target_guilds, failed_targets,
                   attachment_count, status, created_at
            FROM message_logs
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al listar message_logs")?;

        rows.into_iter().map(RelayAttempt::try_from).collect()
    }
}
