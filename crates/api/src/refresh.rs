use std::sync::Arc;
use std::time::Duration;

use stocksearch_core::storage::{DatabaseCredentials, PgSearchLog, SearchLogStore};

use crate::state::SearchLogSlot;

const DRAIN_GRACE: Duration = Duration::from_secs(30);
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Periodically re-reads `DATABASE_URL` and reconnects when the credentials rotate or
/// when no search log is active.
pub fn spawn_credential_refresh(
    slot: SearchLogSlot,
    mut active: Option<DatabaseCredentials>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already connected.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            // Pick up credentials republished into the .env file as well as the process env.
            dotenvy::dotenv_override().ok();
            let latest = match DatabaseCredentials::from_env() {
                Ok(creds) => creds,
                Err(err) => {
                    tracing::warn!(error = %err, "credential refresh skipped");
                    continue;
                }
            };

            let has_store = slot.current().await.is_some();
            if !needs_reopen(active.as_ref(), &latest, has_store) {
                continue;
            }

            match PgSearchLog::open(&latest).await {
                Ok(store) => {
                    let previous = slot.replace(Some(Arc::new(store))).await;
                    if let Some(previous) = previous {
                        tokio::spawn(close_when_idle(previous, DRAIN_GRACE));
                    }
                    tracing::info!(db = %latest.redacted(), "search log reconnected");
                    active = Some(latest);
                }
                Err(err) => {
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(db = %latest.redacted(), error = %err, "search log reconnect failed");
                }
            }
        }
    })
}

/// Closes a swapped-out store once in-flight requests have dropped their handles to it,
/// or after `grace` at the latest.
async fn close_when_idle(store: Arc<dyn SearchLogStore>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    while Arc::strong_count(&store) > 1 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
    }
    store.close().await;
}

fn needs_reopen(
    active: Option<&DatabaseCredentials>,
    latest: &DatabaseCredentials,
    has_store: bool,
) -> bool {
    !has_store || active != Some(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stocksearch_core::domain::search::SearchRecord;

    struct FlaggedStore {
        closed: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl SearchLogStore for FlaggedStore {
        fn backend_name(&self) -> &'static str {
            "flagged"
        }

        async fn record(&self, _record: &SearchRecord) -> anyhow::Result<uuid::Uuid> {
            anyhow::ensure!(!self.closed.load(Ordering::SeqCst), "pool closed");
            Ok(uuid::Uuid::new_v4())
        }

        async fn recent_symbols(&self, _population_size: usize) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn flagged() -> (Arc<dyn SearchLogStore>, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let store: Arc<dyn SearchLogStore> = Arc::new(FlaggedStore {
            closed: closed.clone(),
        });
        (store, closed)
    }

    #[tokio::test]
    async fn replaced_store_stays_open_while_a_request_holds_it() {
        let (store, closed) = flagged();
        let in_flight = store.clone();

        let closer = tokio::spawn(close_when_idle(store, Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!closed.load(Ordering::SeqCst));

        drop(in_flight);
        closer.await.unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn replaced_store_is_closed_after_grace_period() {
        let (store, closed) = flagged();
        let _stuck = store.clone();

        close_when_idle(store, Duration::from_millis(150)).await;
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn idle_store_is_closed_immediately() {
        let (store, closed) = flagged();
        close_when_idle(store, Duration::from_secs(30)).await;
        assert!(closed.load(Ordering::SeqCst));
    }

    fn creds(password: &str) -> DatabaseCredentials {
        DatabaseCredentials::from_url(&format!("postgres://app:{password}@db:5432/stocks")).unwrap()
    }

    #[test]
    fn unchanged_credentials_with_live_store_are_kept() {
        let current = creds("one");
        assert!(!needs_reopen(Some(&current), &creds("one"), true));
    }

    #[test]
    fn rotated_credentials_trigger_reopen() {
        assert!(needs_reopen(Some(&creds("one")), &creds("two"), true));
    }

    #[test]
    fn missing_store_triggers_reopen() {
        let current = creds("one");
        assert!(needs_reopen(Some(&current), &creds("one"), false));
        assert!(needs_reopen(None, &current, false));
        assert!(needs_reopen(None, &current, true));
    }
}
