//! models/relay_model.rs
//! Estructuras del pipeline de reenvío: evento entrante, directorio de
//! servidores, plan de envío, resultado del despacho y registro de auditoría.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canal de texto (id + nombre).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

impl ChannelRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        ChannelRef {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Mensaje observado en algún servidor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub is_bot: bool,
    pub guild_id: String,
    pub guild_name: String,
    pub channel: ChannelRef,
    pub author_tag: String,
    pub content: String,
    pub attachment_urls: Vec<String>,
}

/// Un servidor alcanzable con sus canales de texto,
/// en el orden en que los entrega la plataforma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub guild_id: String,
    pub guild_name: String,
    pub text_channels: Vec<ChannelRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub server_name: String,
    pub channel_name: String,
    pub channel_id: String,
}

impl Destination {
    /// Identificador "server#channel" usado en logs y auditoría.
    pub fn label(&self) -> String {
        format!("{}#{}", self.server_name, self.channel_name)
    }
}

/// Lo que se envía a cada destino.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content: String,
    pub attachment_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPlan {
    pub destinations: Vec<Destination>,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub destination: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub reached: Vec<String>,
    pub failed: Vec<DispatchFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    Success,
    Partial,
    Failed,
}

impl RelayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStatus::Success => "success",
            RelayStatus::Partial => "partial",
            RelayStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RelayStatus::Success),
            "partial" => Ok(RelayStatus::Partial),
            "failed" => Ok(RelayStatus::Failed),
            other => Err(anyhow::anyhow!("Estado de relay desconocido: {}", other)),
        }
    }
}

/// Registro de auditoría de un intento de reenvío. Inmutable una vez creado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayAttempt {
    pub id: String,
    #[serde(rename = "sourceGuild")]
    pub source_server_name: String,
    pub content: String,
    #[serde(rename = "targetGuilds")]
    pub destinations_reached: Vec<String>,
    #[serde(rename = "failedTargets")]
    pub destinations_failed: Vec<DispatchFailure>,
    pub attachment_count: u32,
    pub status: RelayStatus,
    pub created_at: DateTime<Utc>,
}

/// Resumen para el dashboard (GET /api/stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    pub total: u64,
    pub success: u64,
    pub partial: u64,
    pub failed: u64,
    /// Porcentaje redondeado de intentos con estado "success".
    pub success_rate: u64,
}
