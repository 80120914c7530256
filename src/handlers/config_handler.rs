//! handlers/config_handler.rs
//! Endpoints de la configuración del relay.

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use serde_path_to_error::Segment;

use crate::models::config_model::UpdateBotConfig;
use crate::services::capabilities::{ConfigError, ConfigGateway};
use crate::services::config_service::ConfigService;

fn error_response(e: ConfigError) -> HttpResponse {
    match e {
        ConfigError::Validation { field, message } => {
            HttpResponse::BadRequest().json(json!({
                "message": message,
                "field": field
            }))
        }
        other => {
            log::error!("Error de configuración: {:?}", other);
            HttpResponse::InternalServerError().json(json!({
                "message": other.to_string()
            }))
        }
    }
}

/// Errores del extractor JSON (body mal formado, content-type, tamaño):
/// mismo formato `{message, field}` que la validación, sin campo.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("(json_error_handler) Body inválido: {}", err);
    let response = HttpResponse::BadRequest().json(json!({
        "message": err.to_string(),
        "field": Value::Null
    }));
    InternalError::from_response(err, response).into()
}

/// Deserializa el cambio parcial. Un tipo incorrecto se reporta con la
/// ruta del campo, p.e. `isEnabled` o `targetChannels.1`.
fn parse_update(body: Value) -> Result<UpdateBotConfig, ConfigError> {
    serde_path_to_error::deserialize(body).map_err(|e| {
        let field = e
            .path()
            .iter()
            .filter_map(|segment| match segment {
                Segment::Seq { index } => Some(index.to_string()),
                Segment::Map { key } => Some(key.clone()),
                Segment::Enum { variant } => Some(variant.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(".");
        let field = if field.is_empty() { "body".to_string() } else { field };
        ConfigError::validation(&field, e.inner().to_string())
    })
}

/// GET /api/config
pub async fn get_config_endpoint(config_service: web::Data<ConfigService>) -> HttpResponse {
    match config_service.get().await {
        Ok(config) => HttpResponse::Ok().json(config),
        Err(e) => error_response(e),
    }
}

/// POST /api/config
pub async fn update_config_endpoint(
    config_service: web::Data<ConfigService>,
    body: web::Json<Value>,
) -> HttpResponse {
    let changes = match parse_update(body.into_inner()) {
        Ok(changes) => changes,
        Err(e) => return error_response(e),
    };

    // El update necesita la fila creada
    if let Err(e) = config_service.get().await {
        return error_response(e);
    }

    match config_service.update(changes).await {
        Ok(updated) => {
            log::info!(
                "Configuración actualizada: source={}, targets={:?}, enabled={}",
                updated.source_channel,
                updated.target_channels,
                updated.is_enabled
            );
            HttpResponse::Ok().json(updated)
        }
        Err(e) => error_response(e),
    }
}
