//! services/forwarder_service.rs
//! Ejecuta el plan: un envío independiente por destino, todos en paralelo.
//! Un destino que falla no aborta a los demás y no se reintenta.

use futures::future::join_all;

use crate::models::relay_model::{DispatchFailure, DispatchResult, RelayPlan};
use crate::services::capabilities::MessageSender;

/// Largo máximo del motivo de fallo que se guarda por destino.
const MAX_REASON_CHARS: usize = 200;

/// Espera a que terminen todos los envíos antes de devolver el resultado,
/// así la clasificación nunca se hace sobre un subconjunto.
pub async fn dispatch(plan: &RelayPlan, sender: &dyn MessageSender) -> DispatchResult {
    let attempts = plan.destinations.iter().map(|dest| async move {
        let outcome = sender.send(&dest.channel_id, &plan.message).await;
        (dest.label(), outcome)
    });

    let mut result = DispatchResult::default();
    for (label, outcome) in join_all(attempts).await {
        match outcome {
            Ok(()) => {
                log::info!("[OK] -> {}", label);
                result.reached.push(label);
            }
            Err(e) => {
                let reason = short_reason(&e);
                log::warn!("[FAIL] -> {}: {}", label, reason);
                result.failed.push(DispatchFailure {
                    destination: label,
                    reason,
                });
            }
        }
    }
    result
}

fn short_reason(err: &anyhow::Error) -> String {
    let full = format!("{err:#}");
    if full.chars().count() <= MAX_REASON_CHARS {
        return full;
    }
    let mut cut: String = full.chars().take(MAX_REASON_CHARS - 3).collect();
    cut.push_str("...");
    cut
}
