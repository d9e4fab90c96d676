//! hgsmart-bridge - Local REST bridge for HGSmart cloud pet feeders

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hgsmart_bridge::api;
use hgsmart_bridge::config::Config;
use hgsmart_bridge::hgsmart::HgSmartClient;
use hgsmart_bridge::poller::{self, FeederPoller};
use hgsmart_bridge::state::BridgeState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hgsmart_bridge=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting hgsmart-bridge...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    // Build the vendor API client and establish a session
    let settings = &config.hgsmart;
    let api_client = match (&settings.password, &settings.refresh_token) {
        (Some(password), _) => Arc::new(HgSmartClient::new(
            &settings.base_url,
            &settings.username,
            password,
        )),
        (None, Some(refresh_token)) => Arc::new(HgSmartClient::with_refresh_token(
            &settings.base_url,
            &settings.username,
            refresh_token,
        )),
        (None, None) => anyhow::bail!("No credentials configured"),
    };

    if let Err(e) = api_client.authenticate().await {
        anyhow::bail!("Failed to authenticate with HGSmart cloud: {}", e);
    }
    tracing::info!("Authenticated with HGSmart cloud");

    let state = BridgeState::new(api_client);

    // First refresh before serving, so the API does not start empty-handed
    match poller::poll_once(&state).await {
        Ok(count) => tracing::info!("Initial poll found {} devices", count),
        Err(e) => tracing::warn!("Initial poll failed (will retry on interval): {}", e),
    }

    // Background poller
    let poll_interval = Duration::from_secs(settings.update_interval * 60);
    let feeder_poller = Arc::new(FeederPoller::new(state.clone(), poll_interval));
    tokio::spawn(async move {
        feeder_poller.start().await;
    });

    // Build application router
    let cors = CorsLayer::permissive();

    let app = api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
