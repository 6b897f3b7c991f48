//! Shop Catalog - Shopify OAuth app with a product catalog.
//!
//! Serves the backend on `CATALOG_PORT`. In development a second listener on
//! `CATALOG_FRONTEND_PORT` plays the frontend origin the OAuth callback
//! hands off to.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Askama templates for the install, products and bridge pages
//! - Shopify OAuth and Admin REST API over reqwest
//! - `SQLite` for offline session storage and the OAuth nonce cookie session

#![cfg_attr(not(test), forbid(unsafe_code))]

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_catalog_server::config::{AppConfig, ConfigError, LogFormat};
use shop_catalog_server::middleware::create_session_layer;
use shop_catalog_server::middleware::session::create_session_store;
use shop_catalog_server::state::AppState;
use shop_catalog_server::{backend_app, db, frontend_app};

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shop_catalog_server=info,tower_http=debug".into());

    let is_json = config.log_format == LogFormat::Json;
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    // Sentry must be up before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    let pool = db::create_pool(&config.session_database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Session database ready");

    let session_store = create_session_store(&pool).await?;
    let session_layer = create_session_layer(session_store, &config);

    let state = AppState::new(config.clone(), pool)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let backend = {
        let app = backend_app(state.clone(), session_layer);
        let listener = TcpListener::bind(config.socket_addr()).await?;
        tracing::info!(
            environment = ?config.environment,
            "backend listening on http://{}",
            config.socket_addr()
        );
        axum::serve(listener, app).with_graceful_shutdown(wait_for(shutdown_rx.clone()))
    };

    if config.is_production() {
        backend.await?;
    } else {
        let app = frontend_app(state);
        let listener = TcpListener::bind(config.frontend_socket_addr()).await?;
        tracing::info!(
            "frontend listening on http://{}",
            config.frontend_socket_addr()
        );
        let frontend = axum::serve(listener, app).with_graceful_shutdown(wait_for(shutdown_rx));

        tokio::try_join!(
            async { backend.await },
            async { frontend.await }
        )?;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    // Sender dropped also means shut down.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
