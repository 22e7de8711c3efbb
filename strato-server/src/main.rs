use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;
pub mod tool;

use api::AppState;
use config::Config;
use tool::{CliArtifactRegistry, CliProvisioner};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strato_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Strato API...");

    let config = Config::from_env().expect("Failed to load configuration");

    let provisioner = CliProvisioner::new(config.provisioner_bin.clone(), config.region.clone());
    let registry = CliArtifactRegistry::new(config.registry_bin.clone());
    let bind_addr = config.bind_addr.clone();

    let state = AppState {
        config: Arc::new(config),
        provisioner: Arc::new(provisioner),
        registry: Arc::new(registry),
    };

    let app = api::create_router(state);

    tracing::info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
