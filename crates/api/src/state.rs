use std::sync::Arc;

use stocksearch_core::quotes::QuoteProvider;
use stocksearch_core::ranking::TopSearchesOptions;
use stocksearch_core::storage::SearchLogStore;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteProvider>,
    pub search_log: SearchLogSlot,
    pub top_searches: TopSearchesOptions,
}

/// The active search log, swapped when database credentials rotate.
///
/// `None` means degraded mode: searches are served but not logged.
#[derive(Clone, Default)]
pub struct SearchLogSlot {
    inner: Arc<RwLock<Option<Arc<dyn SearchLogStore>>>>,
}

impl SearchLogSlot {
    pub fn new(store: Option<Arc<dyn SearchLogStore>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn current(&self) -> Option<Arc<dyn SearchLogStore>> {
        self.inner.read().await.clone()
    }

    /// Installs `store` and hands back the previous one for the caller to close.
    pub async fn replace(
        &self,
        store: Option<Arc<dyn SearchLogStore>>,
    ) -> Option<Arc<dyn SearchLogStore>> {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, store)
    }
}
