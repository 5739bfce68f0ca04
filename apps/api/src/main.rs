mod config;
mod errors;
mod extractors;
mod interview;
mod llm_client;
mod retry;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extractors::speech::GoogleTts;
use crate::llm_client::gradio::GradioTransport;
use crate::llm_client::InferenceClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Connect to the inference endpoint before accepting traffic; retried, fatal on failure
    let transport = GradioTransport::connect(&config, &config.retry)
        .await
        .context("Failed to connect to the inference endpoint")?;
    let inference = InferenceClient::new(
        Arc::new(transport),
        config.inference_api_name.clone(),
        config.retry,
    );
    info!(
        "Inference client initialized (space: {}, api: {})",
        config.inference_space, config.inference_api_name
    );

    let speech = GoogleTts::new(config.tts_endpoint.clone(), config.inference_timeout)
        .context("Failed to build speech client")?;

    let state = AppState {
        inference,
        speech: Arc::new(speech),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
