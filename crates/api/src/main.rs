//! API server entry point.

use api::config::{Config, LogFormat};
use journal::{InMemoryJournal, Journal, PostgresJournal};
use metrics_exporter_prometheus::PrometheusHandle;
use scheduling::{AvailabilityLedger, InMemoryLedger, PostgresLedger};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<J, L>(config: Config, journal: J, ledger: L, metrics_handle: PrometheusHandle)
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let state = api::create_default_state(journal, ledger, config.business_hours).await;

    // Replay any existing journal entries into the read models
    state
        .projection_processor
        .run_catch_up()
        .await
        .expect("catch-up failed");

    // Free windows left behind by requests that died before reaching the journal
    let sweeper = api::spawn_reservation_sweeper(
        state.clone(),
        config.sweep_interval,
        config.reservation_grace,
    );

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    sweeper.abort();
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing, then read the rest of the configuration
    init_tracing(LogFormat::from_env());
    let config = Config::from_env();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick storage and serve
    match config.database_url.clone() {
        Some(url) => {
            tracing::info!("using PostgreSQL journal and ledger");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");

            let journal = PostgresJournal::new(pool.clone());
            journal
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let ledger = PostgresLedger::new(pool);

            serve(config, journal, ledger, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory journal and ledger");
            serve(
                config,
                InMemoryJournal::new(),
                InMemoryLedger::new(),
                metrics_handle,
            )
            .await;
        }
    }
}
