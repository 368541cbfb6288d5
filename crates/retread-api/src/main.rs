//! Retread API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use retread_api::config::AppConfig;
use retread_api::error::AppError;
use retread_api::state::AppState;
use retread_api::{routes, telemetry};
use retread_core::clock::SystemClock;
use retread_history::application::history_manager::HistoryManager;
use retread_store::pg_journal_store::PgJournalStore;
use retread_store::pg_row_store::PgRowStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Retread API server");

    let result = serve(config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server stopped with an error");
    }
    telemetry::shutdown(tracer_provider);
    result.map_err(Into::into)
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let history = Arc::new(HistoryManager::new(
        Arc::new(PgJournalStore::new(pool.clone())),
        Arc::new(PgRowStore::new(pool)),
        Arc::new(SystemClock),
        config.history,
    ));
    history.load_history(None).await?;
    history.clear_old_history(None).await;

    // TODO: Replace CorsLayer::permissive() with the UI's origin once it is served separately.
    let app = routes::app(AppState::new(history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
