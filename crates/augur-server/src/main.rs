//! augur-server - REST API server binary.

use std::net::SocketAddr;

use augur_core::{PredictorConfig, PredictorEngine};
use augur_server::{create_server, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Build the predictor configuration from the environment.
fn predictor_config() -> Result<PredictorConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::var("AUGUR_CONFIG") {
        Ok(path) => PredictorConfig::from_file(path)?,
        Err(_) => PredictorConfig::default(),
    };
    if let Ok(path) = std::env::var("AUGUR_MODEL_PATH") {
        config.model_path = path.into();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("augur_server=debug".parse().unwrap()),
        )
        .init();

    // Get configuration from environment
    let host = std::env::var("AUGUR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("AUGUR_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("AUGUR_PORT must be a valid port number");

    // Construct the engine; a persisted snapshot is restored if present.
    let config = predictor_config()?;
    let engine = PredictorEngine::new(config);
    info!(
        strategy = ?engine.config().strategy,
        trained = engine.is_trained(),
        "prediction engine ready"
    );

    let state = AppState::new(engine);
    let app = create_server(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting augur-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Best-effort save on the way out; learned state should survive a
    // clean restart.
    if let Err(e) = state.engine.read().await.save() {
        warn!(error = %e, "failed to save model on shutdown");
    }

    info!("Server stopped cleanly");
    Ok(())
}
