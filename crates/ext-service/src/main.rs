//! Extension Service
//!
//! Entry point for the extension server. Serves inter-server APIs that are
//! gated by RS256 tokens issued by the name server.

use ext_service::auth::PublicKeyStore;
use ext_service::config::Config;
use ext_service::routes::{self, AppState};
use ext_service::services::BoxMullerGenerator;
use ext_service::tasks::start_key_refresh;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ext_service=info,ext=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Extension Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        public_key_url = %config.public_key_url,
        jwt_issuer = %config.jwt_issuer,
        client_check_enabled = config.expected_client_id.is_some(),
        protected_path_prefix = %config.protected_path_prefix,
        "Configuration loaded successfully"
    );

    // Install metrics recorder before anything records
    let metrics_handle = routes::init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Build the key store and fetch the key; failure is non-fatal
    let key_store = Arc::new(
        PublicKeyStore::new(
            config.public_key_url.clone(),
            config.key_fetch_connect_timeout,
            config.key_fetch_timeout,
        )
        .map_err(|e| {
            error!("Failed to build key store: {}", e);
            e
        })?,
    );
    key_store.initialize().await;

    let cancel_token = CancellationToken::new();
    let refresh_handle = config.key_refresh_interval.map(|interval| {
        tokio::spawn(start_key_refresh(
            key_store.clone(),
            interval,
            cancel_token.clone(),
        ))
    });

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState::new(
        config,
        key_store,
        Arc::new(BoxMullerGenerator),
    ));

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Extension Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background tasks
    cancel_token.cancel();
    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            warn!("Key refresh task ended abnormally: {}", e);
        }
    }

    info!("Extension Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Graceful shutdown drain period
    let drain_secs: u64 = std::env::var("EXT_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (EXT_DRAIN_SECONDS=0)");
    }
}
