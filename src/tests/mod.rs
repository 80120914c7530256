//! tests/mod.rs
//! Pruebas del relay. Los colaboradores externos (directorio, envío,
//! configuración y log store) se reemplazan por fakes en memoria.

mod storage_tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::models::config_model::{BotConfig, UpdateBotConfig};
use crate::models::relay_model::{
    ChannelRef, InboundMessage, OutboundMessage, RelayAttempt, ServerInfo,
};
use crate::services::capabilities::{
    ConfigError, ConfigGateway, LogStore, MessageSender, ServerDirectory,
};
use crate::services::config_service::ConfigService;

pub fn channel(id: &str, name: &str) -> ChannelRef {
    ChannelRef::new(id, name)
}

pub fn server(guild_id: &str, guild_name: &str, channels: Vec<ChannelRef>) -> ServerInfo {
    ServerInfo {
        guild_id: guild_id.to_string(),
        guild_name: guild_name.to_string(),
        text_channels: channels,
    }
}

pub fn message_in(guild_id: &str, guild_name: &str, channel: ChannelRef) -> InboundMessage {
    InboundMessage {
        is_bot: false,
        guild_id: guild_id.to_string(),
        guild_name: guild_name.to_string(),
        channel,
        author_tag: "trader#0001".to_string(),
        content: "BTO SPY 500C @ 1.20".to_string(),
        attachment_urls: vec![],
    }
}

/// G1 (origen, #live-alerts), G2 (#himothy-alerts), G3 (sin canales que coincidan).
pub fn three_guilds() -> Vec<ServerInfo> {
    vec![
        server(
            "1",
            "G1",
            vec![channel("11", "live-alerts"), channel("12", "general")],
        ),
        server(
            "2",
            "G2",
            vec![channel("21", "general"), channel("22", "himothy-alerts")],
        ),
        server(
            "3",
            "G3",
            vec![channel("31", "general"), channel("32", "memes")],
        ),
    ]
}

/// Base SQLite en memoria con migraciones. Una sola conexión: cada conexión
/// a `sqlite::memory:` es una base distinta.
pub async fn memory_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("No se pudo abrir SQLite en memoria");
    ConfigService::new(pool.clone())
        .run_migrations()
        .await
        .expect("Fallo en migraciones");
    pool
}

pub fn attempt_with(status: crate::models::relay_model::RelayStatus) -> RelayAttempt {
    RelayAttempt {
        id: uuid::Uuid::new_v4().to_string(),
        source_server_name: "G1".to_string(),
        content: "hola".to_string(),
        destinations_reached: vec!["G2#himothy-alerts".to_string()],
        destinations_failed: vec![],
        attachment_count: 0,
        status,
        created_at: Utc::now(),
    }
}

pub struct FakeDirectory {
    servers: Vec<ServerInfo>,
    calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self {
            servers,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerDirectory for FakeDirectory {
    async fn servers(&self) -> Vec<ServerInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.servers.clone()
    }
}

/// Falla para los ids de canal indicados, el resto se acepta.
#[derive(Default)]
pub struct FakeSender {
    failing: Vec<String>,
    pub sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl FakeSender {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_ids(&self) -> Vec<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send(&self, channel_id: &str, message: &OutboundMessage) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message.clone()));
        if self.failing.iter().any(|id| id == channel_id) {
            return Err(anyhow!("Missing Permissions"));
        }
        Ok(())
    }
}

/// Configuration Gateway en memoria que registra cada update.
#[derive(Default)]
pub struct InMemoryConfig {
    config: Mutex<Option<BotConfig>>,
    pub updates: Mutex<Vec<UpdateBotConfig>>,
}

impl InMemoryConfig {
    pub fn with(config: BotConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn current(&self) -> Option<BotConfig> {
        self.config.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigGateway for InMemoryConfig {
    async fn get(&self) -> Result<BotConfig, ConfigError> {
        let mut config = self.config.lock().unwrap();
        Ok(config.get_or_insert_with(BotConfig::default).clone())
    }

    async fn update(&self, changes: UpdateBotConfig) -> Result<BotConfig, ConfigError> {
        self.updates.lock().unwrap().push(changes.clone());
        let mut guard = self.config.lock().unwrap();
        let config = guard.as_mut().ok_or(ConfigError::NotInitialized)?;
        if let Some(source) = changes.source_channel {
            config.source_channel = source;
        }
        if let Some(id) = changes.source_channel_id {
            config.source_channel_id = id;
        }
        if let Some(targets) = changes.target_channels {
            config.target_channels = targets;
        }
        if let Some(enabled) = changes.is_enabled {
            config.is_enabled = enabled;
        }
        Ok(config.clone())
    }
}

#[derive(Default)]
pub struct InMemoryLogStore {
    pub attempts: Mutex<Vec<RelayAttempt>>,
    fail: bool,
}

impl InMemoryLogStore {
    /// Store cuyo append siempre falla.
    pub fn broken() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn len(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, attempt: RelayAttempt) -> anyhow::Result<RelayAttempt> {
        if self.fail {
            return Err(anyhow!("database is locked"));
        }
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(attempt)
    }

    async fn list(&self, limit: u32) -> anyhow::Result<Vec<RelayAttempt>> {
        let attempts = self.attempts.lock().unwrap();
        Ok(attempts
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
