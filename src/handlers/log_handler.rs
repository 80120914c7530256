//! handlers/log_handler.rs
//! Auditoría de reenvíos: listado y resumen.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::config::relay_config::{RelaySettings, MAX_LOG_LIMIT};
use crate::services::capabilities::LogStore;
use crate::services::log_service::LogService;

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<u32>,
}

fn effective_limit(query: &LimitQuery, settings: &RelaySettings) -> u32 {
    query
        .limit
        .unwrap_or(settings.log_limit)
        .clamp(1, MAX_LOG_LIMIT)
}

/// GET /api/logs
pub async fn list_logs_endpoint(
    log_service: web::Data<LogService>,
    settings: web::Data<RelaySettings>,
    query: web::Query<LimitQuery>,
) -> HttpResponse {
    match log_service.list(effective_limit(&query, &settings)).await {
        Ok(logs) => HttpResponse::Ok().json(logs),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/stats
pub async fn stats_endpoint(
    log_service: web::Data<LogService>,
    settings: web::Data<RelaySettings>,
    query: web::Query<LimitQuery>,
) -> HttpResponse {
    match log_service.stats(effective_limit(&query, &settings)).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/health
pub async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
