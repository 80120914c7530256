//! services/capabilities.rs
//! Contratos de los colaboradores externos del pipeline de reenvío.
//! El motor los recibe como parámetros (nada de estado global), lo que
//! permite probarlo con directorios y configuraciones falsas.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::config_model::{BotConfig, UpdateBotConfig};
use crate::models::relay_model::{OutboundMessage, RelayAttempt, ServerInfo};

/// Servidores alcanzables con sus canales de texto.
#[async_trait]
pub trait ServerDirectory: Send + Sync {
    /// Los servidores que no se pueden listar (permisos) se omiten.
    async fn servers(&self) -> Vec<ServerInfo>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, channel_id: &str, message: &OutboundMessage) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ConfigGateway: Send + Sync {
    /// Devuelve la configuración, creándola con valores por defecto si no existe.
    async fn get(&self) -> Result<BotConfig, ConfigError>;

    /// Aplica un cambio parcial. Falla con `NotInitialized` si nunca se llamó a `get`.
    async fn update(&self, changes: UpdateBotConfig) -> Result<BotConfig, ConfigError>;
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, attempt: RelayAttempt) -> anyhow::Result<RelayAttempt>;

    /// Los más recientes primero.
    async fn list(&self, limit: u32) -> anyhow::Result<Vec<RelayAttempt>>;
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Config not initialized")]
    NotInitialized,

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ConfigError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
