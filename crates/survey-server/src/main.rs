//! Survey Server - fleet, mission and report coordination backend

use anyhow::Result;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_server::api;
use survey_server::config::Config;
use survey_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("survey_server=debug".parse()?);
    let (json, plain) = if config.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .init();

    tracing::info!("Starting Survey Server...");

    let port = config.server_port;
    let cors = cors_layer(config.frontend_origin.as_deref());
    let state = Arc::new(AppState::from_config(config).await?);

    let armed = state.restore().await?;
    tracing::info!("Re-armed {} recurring missions", armed);

    let app = api::routes()
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
            tracing::info!("Shutting down");
            // Live channels hold connections open; close them before draining.
            shutdown_state.shutdown();
        })
        .await?;

    Ok(())
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::permissive().allow_origin(AllowOrigin::exact(origin)),
        Some(Err(err)) => {
            tracing::warn!("Ignoring invalid SURVEY_FRONTEND_ORIGIN: {}", err);
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}
