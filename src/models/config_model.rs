//! models/config_model.rs
//! Configuración persistida del relay (fila única) y sus cambios parciales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_SOURCE_CHANNEL: &str = "live-alerts";
pub const DEFAULT_TARGET_CHANNELS: [&str; 2] = ["himothy-alerts", "himothy-trades"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Nombre (o id) del canal que se vigila.
    pub source_channel: String,
    /// Id concreto del canal origen, fijado tras la primera coincidencia por nombre.
    pub source_channel_id: Option<String>,
    /// Nombres lógicos de los canales destino, en orden.
    pub target_channels: Vec<String>,
    pub is_enabled: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            source_channel: DEFAULT_SOURCE_CHANNEL.to_string(),
            source_channel_id: None,
            target_channels: DEFAULT_TARGET_CHANNELS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            is_enabled: true,
            updated_at: None,
        }
    }
}

/// Request de actualización parcial (POST /api/config).
/// Los campos ausentes no se tocan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBotConfig {
    pub source_channel: Option<String>,
    /// Ausente: no se toca. `null`: se libera el id fijado. Valor: se fija.
    #[serde(default, deserialize_with = "present_or_null")]
    pub source_channel_id: Option<Option<String>>,
    pub target_channels: Option<Vec<String>>,
    pub is_enabled: Option<bool>,
}

impl UpdateBotConfig {
    /// Cambio usado por el "lock-in" del canal origen.
    pub fn lock_source(channel_id: &str) -> Self {
        UpdateBotConfig {
            source_channel_id: Some(Some(channel_id.to_string())),
            ..Default::default()
        }
    }

    /// Libera el id fijado; el origen vuelve a compararse por nombre.
    pub fn unlock_source() -> Self {
        UpdateBotConfig {
            source_channel_id: Some(None),
            ..Default::default()
        }
    }
}

/// Distingue un campo presente con `null` de un campo ausente
/// (el ausente lo cubre `#[serde(default)]`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
