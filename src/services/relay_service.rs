//! services/relay_service.rs
//! Pipeline completo para un mensaje observado:
//! motor (match + resolución) -> forwarder (fan-out) -> recorder (auditoría).
//!
//! No guarda estado mutable propio: cada evento lee la configuración y el
//! directorio de nuevo, así que varios eventos pueden procesarse a la vez.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::config_model::UpdateBotConfig;
use crate::models::relay_model::{InboundMessage, RelayAttempt};
use crate::services::capabilities::{ConfigGateway, LogStore, MessageSender, ServerDirectory};
use crate::services::forwarder_service::dispatch;
use crate::services::outcome_service::OutcomeRecorder;
use crate::services::relay_engine::{evaluate, Evaluation};

#[derive(Clone)]
pub struct RelayService {
    config_gateway: Arc<dyn ConfigGateway>,
    recorder: OutcomeRecorder,
}

impl RelayService {
    pub fn new(
        config_gateway: Arc<dyn ConfigGateway>,
        log_store: Arc<dyn LogStore>,
        content_limit: usize,
    ) -> Self {
        Self {
            config_gateway,
            recorder: OutcomeRecorder::new(log_store, content_limit),
        }
    }

    /// Devuelve `None` si el mensaje se ignoró (no se crea registro).
    /// Solo falla si no se pudo leer la configuración.
    pub async fn process(
        &self,
        event: &InboundMessage,
        directory: &dyn ServerDirectory,
        sender: &dyn MessageSender,
    ) -> Result<Option<RelayAttempt>> {
        let config = self
            .config_gateway
            .get()
            .await
            .context("No se pudo leer la configuración del relay")?;

        let (plan, lock_in) = match evaluate(event, &config, directory).await {
            Evaluation::Ignored(reason) => {
                log::trace!(
                    "(process) Ignorado #{} ({}): {}",
                    event.channel.name,
                    event.guild_name,
                    reason
                );
                return Ok(None);
            }
            Evaluation::Matched { plan, lock_in } => (plan, lock_in),
        };

        if let Some(channel_id) = lock_in {
            self.lock_source_channel(&channel_id).await;
        }

        if plan.destinations.is_empty() {
            log::warn!(
                "(process) Ningún servidor tiene canales que coincidan con {:?}",
                config.target_channels
            );
        }

        let result = dispatch(&plan, sender).await;
        if !result.failed.is_empty() {
            let errors: Vec<String> = result
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.destination, f.reason))
                .collect();
            log::warn!("[ERRORS] {}", errors.join(", "));
        }

        let attempt = self
            .recorder
            .record(
                &event.guild_name,
                &event.content,
                plan.message.attachment_urls.len(),
                result,
            )
            .await;
        Ok(Some(attempt))
    }

    /// Fija el id del canal origen. Es idempotente: si dos mensajes llegan
    /// antes de que se vea el cambio, ambos escriben y gana el último.
    async fn lock_source_channel(&self, channel_id: &str) {
        match self
            .config_gateway
            .update(UpdateBotConfig::lock_source(channel_id))
            .await
        {
            Ok(_) => log::info!("(process) Canal origen fijado por id={}", channel_id),
            Err(e) => log::warn!(
                "(process) No se pudo fijar el id del canal origen {}: {}",
                channel_id,
                e
            ),
        }
    }
}
