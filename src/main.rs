use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use crate::attendance::AttendanceService;
use crate::config::Config;
use crate::db::{init_db, seed_admin};
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::store::MySqlStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting...");

    let pool = init_db(&config).await?;
    if let Some(seed) = &config.admin_seed {
        seed_admin(&pool, seed).await?;
    }

    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("Failed to create upload directory {}", config.upload_dir))?;

    let store = Arc::new(MySqlStore::new(pool.clone()));
    let service = Data::new(AttendanceService::new(
        store.clone(),
        store,
        config.store_timeout,
    ));
    let limiters = Data::new(Limiters::from_config(&config)?);

    let server_addr = config.server_addr.clone();
    let pool_data = Data::new(pool.clone());
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let limiters = limiters.clone();
        let config = config_data.clone();

        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(routes::cors(&config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(service.clone())
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .app_data(routes::path_config())
            // auth + protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;
    Ok(())
}
