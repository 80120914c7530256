//! services/relay_engine.rs
//! Decide si un mensaje viene del canal origen y resuelve, en todos los
//! demás servidores, los canales destino que corresponden a cada
//! identificador configurado.

use std::fmt;

use crate::models::config_model::BotConfig;
use crate::models::relay_model::{
    Destination, InboundMessage, OutboundMessage, RelayPlan, ServerInfo,
};
use crate::services::capabilities::ServerDirectory;
use crate::services::channel_matcher::matches;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Disabled,
    BotAuthor,
    /// No hay identificador de origen ni id fijado.
    SourceUnset,
    NotSourceChannel,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            IgnoreReason::Disabled => "relay deshabilitado",
            IgnoreReason::BotAuthor => "autor es un bot",
            IgnoreReason::SourceUnset => "canal origen sin configurar",
            IgnoreReason::NotSourceChannel => "no es el canal origen",
        };
        f.write_str(txt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Ignored(IgnoreReason),
    Matched {
        plan: RelayPlan,
        /// Id a persistir como `source_channel_id` (primera coincidencia por nombre).
        lock_in: Option<String>,
    },
}

impl Evaluation {
    pub fn plan(&self) -> Option<&RelayPlan> {
        match self {
            Evaluation::Matched { plan, .. } => Some(plan),
            Evaluation::Ignored(_) => None,
        }
    }

    pub fn into_plan(self) -> Option<RelayPlan> {
        match self {
            Evaluation::Matched { plan, .. } => Some(plan),
            Evaluation::Ignored(_) => None,
        }
    }
}

/// Verifica que el mensaje venga del canal origen.
///
/// Con `source_channel_id` fijado la comparación es solo por id (inmune a
/// renombres). Sin él se compara por nombre y, si coincide, se devuelve el
/// id observado para fijarlo.
pub fn match_source(
    event: &InboundMessage,
    config: &BotConfig,
) -> Result<Option<String>, IgnoreReason> {
    if !config.is_enabled {
        return Err(IgnoreReason::Disabled);
    }
    // Nunca reenviar mensajes de bots: evita loops con nuestro propio reenvío.
    if event.is_bot {
        return Err(IgnoreReason::BotAuthor);
    }

    if let Some(locked) = config.source_channel_id.as_deref().filter(|id| !id.is_empty()) {
        return if event.channel.id == locked {
            Ok(None)
        } else {
            Err(IgnoreReason::NotSourceChannel)
        };
    }

    let identifier = config.source_channel.as_str();
    if identifier.trim().is_empty() {
        return Err(IgnoreReason::SourceUnset);
    }
    // El identificador también puede ser directamente un id de canal.
    if event.channel.id == identifier {
        return Ok(None);
    }
    if matches(&event.channel.name, identifier) {
        return Ok(Some(event.channel.id.clone()));
    }
    Err(IgnoreReason::NotSourceChannel)
}

/// Arma el plan de envío: por cada servidor distinto al de origen y por cada
/// identificador destino no vacío, el primer canal cuyo nombre coincide.
///
/// "Primero" es según el orden que entrega el directorio, que no es estable:
/// si varios canales de un servidor coinciden, cuál gana es arbitrario.
pub fn resolve(event: &InboundMessage, config: &BotConfig, servers: &[ServerInfo]) -> RelayPlan {
    let targets: Vec<&str> = config
        .target_channels
        .iter()
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .collect();

    let mut destinations = Vec::new();
    for server in servers.iter().filter(|s| s.guild_id != event.guild_id) {
        let mut used: Vec<&str> = Vec::new();
        for target in &targets {
            let Some(channel) = server
                .text_channels
                .iter()
                .find(|c| matches(&c.name, target))
            else {
                continue;
            };
            // Dos identificadores pueden caer en el mismo canal: se envía una sola vez.
            if used.contains(&channel.id.as_str()) {
                continue;
            }
            used.push(channel.id.as_str());
            destinations.push(Destination {
                server_name: server.guild_name.clone(),
                channel_name: channel.name.clone(),
                channel_id: channel.id.clone(),
            });
        }
    }

    RelayPlan {
        destinations,
        message: OutboundMessage {
            content: event.content.clone(),
            attachment_urls: event.attachment_urls.clone(),
        },
    }
}

/// IGNORED | SOURCE_MATCHED -> RESOLVING -> plan listo para despachar.
/// El directorio solo se consulta si el mensaje coincidió con el origen.
pub async fn evaluate(
    event: &InboundMessage,
    config: &BotConfig,
    directory: &dyn ServerDirectory,
) -> Evaluation {
    let lock_in = match match_source(event, config) {
        Ok(lock_in) => lock_in,
        Err(reason) => return Evaluation::Ignored(reason),
    };

    log::info!(
        "[MATCH] Mensaje en #{} ({}) de {}: {}",
        event.channel.name,
        event.guild_name,
        event.author_tag,
        preview(&event.content, 100)
    );

    let servers = directory.servers().await;
    let plan = resolve(event, config, &servers);
    log::debug!(
        "(evaluate) {} destinos resueltos en {} servidores",
        plan.destinations.len(),
        servers.len()
    );

    Evaluation::Matched { plan, lock_in }
}

fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
