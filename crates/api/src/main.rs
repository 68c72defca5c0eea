use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocksearch_core::config::Settings;
use stocksearch_core::quotes::{QuoteProvider, YahooChartProvider};
use stocksearch_core::ranking::TopSearchesOptions;
use stocksearch_core::storage::{DatabaseCredentials, MemorySearchLog, PgSearchLog, SearchLogStore};

mod refresh;
mod routes;
mod state;

use state::{AppState, SearchLogSlot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let quotes: Arc<dyn QuoteProvider> = Arc::new(YahooChartProvider::from_settings(&settings)?);

    let (store, active_credentials) = open_search_log(&settings).await;
    let search_log = SearchLogSlot::new(store);

    if let Some(secs) = settings.database_refresh_secs {
        tracing::info!(every_secs = secs, "database credential refresh enabled");
        refresh::spawn_credential_refresh(
            search_log.clone(),
            active_credentials,
            Duration::from_secs(secs),
        );
    }

    let state = AppState {
        quotes,
        search_log: search_log.clone(),
        top_searches: TopSearchesOptions::from_env(),
    };

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = search_log.replace(None).await {
        store.close().await;
    }

    Ok(())
}

/// Opens the search log named by `DATABASE_URL`.
///
/// Without `DATABASE_URL` searches are kept in memory. A configured but unreachable
/// database starts the API in degraded mode, where searches are served but not logged.
async fn open_search_log(
    settings: &Settings,
) -> (Option<Arc<dyn SearchLogStore>>, Option<DatabaseCredentials>) {
    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL missing; keeping the search log in memory");
        return (Some(Arc::new(MemorySearchLog::new())), None);
    };

    let credentials = match DatabaseCredentials::from_url(db_url) {
        Ok(credentials) => credentials,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL invalid; starting API in degraded mode");
            return (None, None);
        }
    };

    match PgSearchLog::open(&credentials).await {
        Ok(store) => (Some(Arc::new(store)), Some(credentials)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "search log unavailable; starting API in degraded mode");
            (None, Some(credentials))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
