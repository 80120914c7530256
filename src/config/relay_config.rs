//! config/relay_config.rs
//! Parámetros globales del servicio, con valores por defecto
//! (se sobreescriben desde el entorno / .env).

use anyhow::{Context, Result};
use serde::Serialize;

/// Largo máximo del contenido guardado en la auditoría.
pub const DEFAULT_CONTENT_LIMIT: usize = 500;
/// Cantidad de registros que devuelve /api/logs si no se indica otra.
pub const DEFAULT_LOG_LIMIT: u32 = 50;
pub const MAX_LOG_LIMIT: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelaySettings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub content_limit: usize,
    pub log_limit: u32,
    /// Carpeta con el build estático del dashboard (opcional).
    pub dashboard_dir: Option<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: "sqlite:data/relay.db".to_string(),
            content_limit: DEFAULT_CONTENT_LIMIT,
            log_limit: DEFAULT_LOG_LIMIT,
            dashboard_dir: None,
        }
    }
}

impl RelaySettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de lookup,
    /// así los tests no dependen del entorno real.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RelaySettings::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match value("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT inválido: {raw}"))?,
            None => defaults.port,
        };
        let content_limit = match value("RELAY_CONTENT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("RELAY_CONTENT_LIMIT inválido: {raw}"))?,
            None => defaults.content_limit,
        };
        let log_limit = match value("RELAY_LOG_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("RELAY_LOG_LIMIT inválido: {raw}"))?
                .clamp(1, MAX_LOG_LIMIT),
            None => defaults.log_limit,
        };

        Ok(RelaySettings {
            host: value("HOST").unwrap_or(defaults.host),
            port,
            database_url: value("DATABASE_URL").unwrap_or(defaults.database_url),
            content_limit,
            log_limit,
            dashboard_dir: value("DASHBOARD_DIR"),
        })
    }
}
