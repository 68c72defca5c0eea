use crate::domain::search::SearchRecord;
use crate::storage::searches::SearchLogStore;
use uuid::Uuid;

/// In-process search log for local runs without Postgres. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemorySearchLog {
    inner: tokio::sync::Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<(Uuid, SearchRecord)>,
    closed: bool,
}

impl MemorySearchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn records(&self) -> Vec<SearchRecord> {
        let guard = self.inner.lock().await;
        guard.rows.iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait::async_trait]
impl SearchLogStore for MemorySearchLog {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, record: &SearchRecord) -> anyhow::Result<Uuid> {
        let mut guard = self.inner.lock().await;
        anyhow::ensure!(!guard.closed, "search log is closed");

        let id = Uuid::new_v4();
        guard.rows.push((id, record.clone()));
        Ok(id)
    }

    async fn recent_symbols(&self, population_size: usize) -> anyhow::Result<Vec<String>> {
        let guard = self.inner.lock().await;
        anyhow::ensure!(!guard.closed, "search log is closed");

        // Newest first; rows with equal timestamps keep reverse insertion order.
        let mut rows: Vec<&SearchRecord> = guard.rows.iter().rev().map(|(_, r)| r).collect();
        rows.sort_by(|a, b| b.searched_at.cmp(&a.searched_at));

        Ok(rows
            .into_iter()
            .take(population_size)
            .map(|r| r.symbol.to_string())
            .collect())
    }

    async fn close(&self) {
        self.inner.lock().await.closed = true;
    }
}
