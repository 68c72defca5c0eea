use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocksearch_core::config::Settings;
use stocksearch_core::domain::quote::Interval;
use stocksearch_core::domain::search::Symbol;
use stocksearch_core::quotes::{HistoryRange, QuoteProvider, UnknownSymbolError, YahooChartProvider};
use stocksearch_core::ranking::TopSearchesOptions;
use stocksearch_core::storage::{self, DatabaseCredentials, PgSearchLog, SearchLogStore};
use stocksearch_core::time::form_date::parse_form_date;

mod seed;

#[derive(Debug, Parser)]
#[command(name = "stocksearch_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Print the current quote for a symbol as JSON.
    Quote { symbol: String },

    /// Print daily/weekly/monthly bars for a symbol as JSON.
    History {
        symbol: String,

        /// First day (MM/DD/YYYY or YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Last day, inclusive.
        #[arg(long)]
        end: String,

        /// DAILY, WEEKLY or MONTHLY.
        #[arg(long)]
        interval: Option<String>,
    },

    /// Rank the most searched symbols among recent searches.
    TopSearches {
        #[arg(long)]
        max_results: Option<usize>,

        #[arg(long)]
        population_size: Option<usize>,
    },

    /// Insert deterministic demo searches.
    Seed {
        #[arg(long, default_value_t = 100)]
        count: usize,

        /// Build the rows without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the configured database and whether it is reachable.
    CheckDb,
}

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

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        if err.downcast_ref::<UnknownSymbolError>().is_none() {
            sentry_anyhow::capture_anyhow(err);
        }
    }
    result
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Migrate => {
            let credentials = DatabaseCredentials::from_settings(settings)?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(1)
                .connect_with(credentials.connect_options()?)
                .await
                .with_context(|| format!("connect {} failed", credentials.redacted()))?;

            storage::migrate(&pool).await?;
            pool.close().await;

            tracing::info!(db = %credentials.redacted(), "migrations applied");
        }
        Command::Quote { symbol } => {
            let symbol = Symbol::parse(&symbol)?;
            let provider = YahooChartProvider::from_settings(settings)?;
            let quote = provider.fetch_quote(&symbol).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Command::History {
            symbol,
            start,
            end,
            interval,
        } => {
            let symbol = Symbol::parse(&symbol)?;
            let range = HistoryRange::new(
                parse_form_date(Some(&start))?,
                parse_form_date(Some(&end))?,
                Interval::parse(interval.as_deref())?,
            )?;
            let provider = YahooChartProvider::from_settings(settings)?;
            let history = provider.fetch_history(&symbol, &range).await?;

            tracing::info!(%symbol, bars = history.bars.len(), "history fetched");
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::TopSearches {
            max_results,
            population_size,
        } => {
            let opts = TopSearchesOptions::from_env().with_overrides(max_results, population_size);
            let store = open_store(settings).await?;
            let ranked = storage::top_searches(&store, opts).await;
            store.close().await;

            for (rank, symbol) in ranked?.iter().enumerate() {
                println!("{:>2}. {symbol}", rank + 1);
            }
        }
        Command::Seed { count, dry_run } => {
            let rows = seed::demo_searches(count, chrono::Utc::now())?;

            if dry_run {
                tracing::info!(rows = rows.len(), dry_run = true, "seed rows built");
                return Ok(());
            }

            let store = open_store(settings).await?;
            let mut inserted = 0usize;
            for row in &rows {
                if let Err(err) = store.record(row).await {
                    store.close().await;
                    return Err(err).context("seed insert failed");
                }
                inserted += 1;
            }
            store.close().await;

            tracing::info!(inserted, "seeded demo searches");
        }
        Command::CheckDb => {
            let credentials = DatabaseCredentials::from_settings(settings)?;
            println!("database: {}", credentials.redacted());

            let store = PgSearchLog::open(&credentials).await?;
            let counted = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM searches")
                .persistent(false)
                .fetch_one(store.pool())
                .await
                .context("count searches failed");
            store.close().await;

            let (rows,) = counted?;
            println!("reachable: yes ({rows} logged searches)");
        }
    }

    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<PgSearchLog> {
    let credentials = DatabaseCredentials::from_settings(settings)?;
    PgSearchLog::open(&credentials).await
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
