// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use log::{info, warn};
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::AppConfig;
use crate::handlers::{analyze_terrain, health_check, proxy_model};
use crate::services::{
    ImageCodec, ModelGenerationClient, ModelRelay, Orchestrator, SceneAnalysisClient,
};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    relay: Arc<ModelRelay>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting terrain insight service...");

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    if config.model_generation.api_key.is_none() {
        warn!("TRIPO3D_API_KEY is not set; model generation requests will fail");
    }
    if config.scene_analysis.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; terrain analysis requests will fail");
    }

    // One connection pool shared by both remote clients
    let http_client = reqwest::Client::new();

    let model_generator = Arc::new(ModelGenerationClient::from_config(
        http_client.clone(),
        &config.model_generation,
    ));
    let scene_analyzer = Arc::new(SceneAnalysisClient::new(
        http_client,
        &config.scene_analysis,
    ));

    // The relay keeps its own client so redirects can be checked against the allow-list
    let relay = ModelRelay::new(&config.relay)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let app_state = AppState {
        orchestrator: Arc::new(Orchestrator::new(
            ImageCodec::new(config.max_upload_bytes),
            model_generator,
            scene_analyzer,
        )),
        relay: Arc::new(relay),
    };

    let bind_address = (config.server.host.clone(), config.server.port);
    info!(
        "Starting HTTP server on {}:{} (poll every {:?}, max {} attempts)",
        bind_address.0,
        bind_address.1,
        config.model_generation.poll.interval,
        config.model_generation.poll.max_attempts
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api")
                    .route("/analyze-terrain", web::post().to(analyze_terrain))
                    .route("/proxy-model", web::get().to(proxy_model)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(bind_address)?
    .run()
    .await
}
