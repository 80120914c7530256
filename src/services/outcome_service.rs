//! services/outcome_service.rs
//! Última etapa del pipeline: clasifica el resultado del despacho y guarda
//! el registro de auditoría. Si guardar falla solo se loguea: el reenvío
//! ya ocurrió y perder la fila es aceptable.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::relay_model::{DispatchResult, RelayAttempt, RelayStatus};
use crate::services::capabilities::LogStore;

/// success: hubo destinos alcanzados y ningún fallo.
/// partial: hubo destinos alcanzados y al menos un fallo.
/// failed: ningún destino alcanzado (haya o no fallos).
pub fn classify(result: &DispatchResult) -> RelayStatus {
    match (result.reached.is_empty(), result.failed.is_empty()) {
        (true, _) => RelayStatus::Failed,
        (false, true) => RelayStatus::Success,
        (false, false) => RelayStatus::Partial,
    }
}

/// Corta en caracteres (no bytes) para no partir un carácter UTF-8.
pub fn truncate_content(content: &str, limit: usize) -> String {
    content.chars().take(limit).collect()
}

#[derive(Clone)]
pub struct OutcomeRecorder {
    store: Arc<dyn LogStore>,
    content_limit: usize,
}

impl OutcomeRecorder {
    pub fn new(store: Arc<dyn LogStore>, content_limit: usize) -> Self {
        Self {
            store,
            content_limit,
        }
    }

    pub async fn record(
        &self,
        source_server_name: &str,
        content: &str,
        attachment_count: usize,
        result: DispatchResult,
    ) -> RelayAttempt {
        let status = classify(&result);
        let attempt = RelayAttempt {
            id: Uuid::new_v4().to_string(),
            source_server_name: source_server_name.to_string(),
            content: truncate_content(content, self.content_limit),
            destinations_reached: result.reached,
            destinations_failed: result.failed,
            attachment_count: u32::try_from(attachment_count).unwrap_or(u32::MAX),
            status,
            created_at: Utc::now(),
        };

        let reached = if attempt.destinations_reached.is_empty() {
            "none".to_string()
        } else {
            attempt.destinations_reached.join(", ")
        };
        log::info!("[LOG] Status: {}, Forwarded to: {}", status, reached);

        match self.store.append(attempt.clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                log::error!(
                    "(record) No se pudo guardar el intento {}: {:?}",
                    attempt.id,
                    e
                );
                attempt
            }
        }
    }
}
