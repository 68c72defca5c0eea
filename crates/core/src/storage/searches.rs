use crate::domain::search::SearchRecord;
use crate::ranking::{rank_top_searches, TopSearchesOptions};
use crate::storage::credentials::DatabaseCredentials;
use anyhow::Context;
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Append-only log of quote searches.
#[async_trait::async_trait]
pub trait SearchLogStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn record(&self, record: &SearchRecord) -> anyhow::Result<Uuid>;

    /// Symbols of the `population_size` most recent searches, newest first.
    async fn recent_symbols(&self, population_size: usize) -> anyhow::Result<Vec<String>>;

    async fn close(&self);
}

/// Ranks the most searched symbols among the most recent log rows.
pub async fn top_searches(
    store: &dyn SearchLogStore,
    opts: TopSearchesOptions,
) -> anyhow::Result<Vec<String>> {
    if opts.max_results == 0 || opts.population_size == 0 {
        return Ok(Vec::new());
    }
    let sample = store.recent_symbols(opts.population_size).await?;
    Ok(rank_top_searches(&sample, opts.max_results))
}

#[derive(Debug, Clone)]
pub struct PgSearchLog {
    pool: sqlx::PgPool,
    credentials: DatabaseCredentials,
}

impl PgSearchLog {
    /// Connects with the given credentials and applies pending migrations.
    pub async fn open(credentials: &DatabaseCredentials) -> anyhow::Result<Self> {
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(credentials.connect_options()?)
            .await
            .with_context(|| format!("connect {} failed", credentials.redacted()))?;

        crate::storage::migrate(&pool).await?;

        tracing::info!(db = %credentials.redacted(), max_connections, "search log opened");

        Ok(Self {
            pool,
            credentials: credentials.clone(),
        })
    }

    pub fn credentials(&self) -> &DatabaseCredentials {
        &self.credentials
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl SearchLogStore for PgSearchLog {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn record(&self, record: &SearchRecord) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO searches (id, stock_symbol, type_of_search, user_id, device, family, family_version, os, os_version, time_stamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .persistent(false)
        .bind(id)
        .bind(record.symbol.as_str())
        .bind(record.kind.as_db_code())
        .bind(record.user_id)
        .bind(&record.client.device)
        .bind(&record.client.family)
        .bind(&record.client.family_version)
        .bind(&record.client.os)
        .bind(&record.client.os_version)
        .bind(record.searched_at)
        .execute(&self.pool)
        .await
        .context("insert searches failed")?;

        Ok(id)
    }

    async fn recent_symbols(&self, population_size: usize) -> anyhow::Result<Vec<String>> {
        if population_size == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(population_size).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT stock_symbol \
             FROM searches \
             ORDER BY time_stamp DESC, id DESC \
             LIMIT $1",
        )
        .persistent(false)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("select recent searches failed")?;

        Ok(rows.into_iter().map(|(symbol,)| symbol).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!(db = %self.credentials.redacted(), "search log closed");
    }
}
