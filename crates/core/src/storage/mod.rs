pub mod credentials;
pub mod memory;
pub mod searches;

use anyhow::Context;

pub use credentials::DatabaseCredentials;
pub use memory::MemorySearchLog;
pub use searches::{top_searches, PgSearchLog, SearchLogStore};

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
