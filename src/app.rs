//! app.rs
use crate::handlers::{config_handler, log_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(
                web::JsonConfig::default().error_handler(config_handler::json_error_handler),
            )
            .service(
                web::resource("/config")
                    .route(web::get().to(config_handler::get_config_endpoint))
                    .route(web::post().to(config_handler::update_config_endpoint)),
            )
            .route("/logs", web::get().to(log_handler::list_logs_endpoint))
            .route("/stats", web::get().to(log_handler::stats_endpoint))
            .route("/health", web::get().to(log_handler::health_endpoint)),
    );
}
