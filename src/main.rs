use std::str::FromStr;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::credentials::CredentialProvider;
use crate::config::relay_config::RelaySettings;
use crate::logger::init_logger;
use crate::services::config_service::ConfigService;
use crate::services::discord_service::run_bot;
use crate::services::log_service::LogService;
use crate::services::relay_service::RelayService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;
#[cfg(test)]
mod tests;

async fn setup_database(database_url: &str) -> Result<Pool<Sqlite>> {
    // La carpeta del archivo SQLite tiene que existir (p.e. ./data)
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !path.starts_with(":memory:") {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("No se pudo crear directorio {:?}", parent))?;
            }
        }
    }

    log::info!("Conectando a SQLite en {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("DATABASE_URL inválida: {database_url}"))?
        .create_if_missing(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite.")?;

    Ok(db_pool)
}

/// Levanta el bot en segundo plano. Si no hay credenciales o el login falla,
/// se loguea y el dashboard sigue funcionando.
fn spawn_discord_bot(relay_service: RelayService) {
    tokio::spawn(async move {
        log::info!("Iniciando bot de Discord...");
        let token = match CredentialProvider::from_env().resolve().await {
            Ok(token) => token,
            Err(e) => {
                log::error!("No se pudo iniciar el bot de Discord: {:?}", e);
                return;
            }
        };
        if let Err(e) = run_bot(&token, relay_service).await {
            log::error!("El bot de Discord se detuvo: {:?}", e);
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let settings = RelaySettings::from_env().expect("Configuración inválida");

    let db_pool = setup_database(&settings.database_url)
        .await
        .expect("No se pudo inicializar la base de datos");

    let config_service = ConfigService::new(db_pool.clone());
    if let Err(e) = config_service.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }
    let log_service = LogService::new(db_pool.clone());

    let relay_service = RelayService::new(
        Arc::new(config_service.clone()),
        Arc::new(log_service.clone()),
        settings.content_limit,
    );
    spawn_discord_bot(relay_service);

    log::info!("Levantando servidor en {}:{}", settings.host, settings.port);
    let bind_addr = (settings.host.clone(), settings.port);
    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(web::Data::new(config_service.clone()))
            .app_data(web::Data::new(log_service.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(app::init_app);

        // Build estático del dashboard, si está configurado
        if let Some(dir) = settings.dashboard_dir.as_deref() {
            if std::path::Path::new(dir).is_dir() {
                app = app.service(actix_files::Files::new("/", dir).index_file("index.html"));
            }
        }
        app
    })
    .bind(bind_addr)?
    .run()
    .await
}
