use anyhow::Context;
use tracing_subscriber::EnvFilter;

use taskilo_api::config::AppConfig;
use taskilo_api::database::DatabaseManager;
use taskilo_api::jobs::Scheduler;
use taskilo_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskilo_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    tracing::info!("Starting Taskilo API in {:?} mode", config.environment);

    let store = DatabaseManager::open(&config.database)
        .await
        .context("failed to open document store")?;
    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let state = AppState::from_config(config, store).context("failed to configure integrations")?;

    let scheduler = Scheduler::start(state.clone());
    let app = taskilo_api::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Taskilo API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.shutdown();
    tracing::info!("Taskilo API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
