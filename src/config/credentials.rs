//! config/credentials.rs
//! Resolución del token del bot: token explícito > token de la conexión
//! administrada (Replit connectors) > error.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Una fuente posible del token. `Ok(None)` significa "no configurada".
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &str;
    async fn token(&self) -> Result<Option<String>>;
}

/// Token entregado directamente (DISCORD_TOKEN).
pub struct ExplicitToken {
    token: Option<String>,
}

impl ExplicitToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl TokenSource for ExplicitToken {
    fn name(&self) -> &str {
        "DISCORD_TOKEN"
    }

    async fn token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Token obtenido del conector de Discord administrado por la plataforma de hosting.
pub struct ManagedConnection {
    base_url: Option<String>,
    identity_header: Option<String>,
    http_client: Client,
}

impl ManagedConnection {
    pub fn new(base_url: Option<String>, identity_header: Option<String>) -> Self {
        Self {
            base_url,
            identity_header,
            http_client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("REPLIT_CONNECTORS_HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .map(|h| format!("https://{h}"));
        let identity = identity_header(
            std::env::var("REPL_IDENTITY").ok(),
            std::env::var("WEB_REPL_RENEWAL").ok(),
        );
        Self::new(base_url, identity)
    }
}

#[async_trait]
impl TokenSource for ManagedConnection {
    fn name(&self) -> &str {
        "managed-connection"
    }

    async fn token(&self) -> Result<Option<String>> {
        let (Some(base_url), Some(identity)) = (&self.base_url, &self.identity_header) else {
            return Ok(None);
        };

        let url = format!("{base_url}/api/v2/connection?include_secrets=true&connector_names=discord");
        let body = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("X_REPLIT_TOKEN", identity)
            .send()
            .await
            .context("Fallo al consultar la conexión administrada")?
            .error_for_status()
            .context("La conexión administrada respondió con error")?
            .json::<Value>()
            .await
            .context("Respuesta JSON inválida de la conexión administrada")?;

        extract_access_token(&body)
            .map(Some)
            .ok_or_else(|| anyhow!("Discord no conectado: la conexión no trae access_token"))
    }
}

/// Header de identidad: "repl <id>" tiene prioridad sobre "depl <renewal>".
pub fn identity_header(
    repl_identity: Option<String>,
    web_repl_renewal: Option<String>,
) -> Option<String> {
    match (
        repl_identity.filter(|v| !v.is_empty()),
        web_repl_renewal.filter(|v| !v.is_empty()),
    ) {
        (Some(id), _) => Some(format!("repl {id}")),
        (None, Some(renewal)) => Some(format!("depl {renewal}")),
        (None, None) => None,
    }
}

/// Extrae el token de `items[0].settings`.
pub fn extract_access_token(body: &Value) -> Option<String> {
    let settings = body.get("items")?.get(0)?.get("settings")?;
    settings
        .get("access_token")
        .and_then(Value::as_str)
        .or_else(|| {
            settings
                .pointer("/oauth/credentials/access_token")
                .and_then(Value::as_str)
        })
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub struct CredentialProvider {
    sources: Vec<Box<dyn TokenSource>>,
}

impl CredentialProvider {
    /// Las fuentes se consultan en el orden recibido.
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    pub fn from_env() -> Self {
        Self::new(vec![
            Box::new(ExplicitToken::new(std::env::var("DISCORD_TOKEN").ok())),
            Box::new(ManagedConnection::from_env()),
        ])
    }

    pub async fn resolve(&self) -> Result<String> {
        for source in &self.sources {
            match source.token().await {
                Ok(Some(token)) => {
                    log::info!("(credentials) Token obtenido desde {}", source.name());
                    return Ok(token);
                }
                Ok(None) => {
                    log::debug!("(credentials) {} no está configurado", source.name());
                }
                Err(e) => {
                    log::warn!("(credentials) Fallo la fuente {}: {:?}", source.name(), e);
                }
            }
        }
        Err(anyhow!(
            "Discord no conectado: no hay DISCORD_TOKEN ni conexión administrada"
        ))
    }
}
