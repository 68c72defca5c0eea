use axum::{
    extract::{Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::Html,
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;

use stocksearch_core::domain::search::{ClientInfo, SearchRecord};
use stocksearch_core::ranking::TopSearchesOptions;
use stocksearch_core::render::html;
use stocksearch_core::search::{run_search, SearchForm, SearchRequest};
use stocksearch_core::storage::top_searches;

use crate::state::{AppState, SearchLogSlot};

// Upper bound on rows sampled per top-searches request.
const MAX_POPULATION_SIZE: usize = 10_000;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/StockSearch",
            get(stock_search_query).post(stock_search_form),
        )
        .route("/TopSearches", get(top_searches_fragment))
        .route("/api/top-searches", get(top_searches_json))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stock_search_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(form): Query<SearchForm>,
) -> Html<String> {
    handle_search(&state, &headers, form).await
}

async fn stock_search_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SearchForm>,
) -> Html<String> {
    handle_search(&state, &headers, form).await
}

async fn handle_search(state: &AppState, headers: &HeaderMap, form: SearchForm) -> Html<String> {
    let Some(request) = SearchRequest::from_form(form) else {
        return Html(String::new());
    };

    let outcome = run_search(state.quotes.as_ref(), &request).await;
    if let Some(err) = &outcome.failure {
        sentry_anyhow::capture_anyhow(err);
    }

    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let client = ClientInfo::from_user_agent(user_agent);
    if let Some(record) = request.search_record(client, chrono::Utc::now()) {
        record_search(&state.search_log, &record).await;
    }

    Html(outcome.fragment())
}

/// Logging a search never fails the request.
async fn record_search(slot: &SearchLogSlot, record: &SearchRecord) {
    let Some(store) = slot.current().await else {
        tracing::debug!(symbol = %record.symbol, "no search log available; search not recorded");
        return;
    };

    match store.record(record).await {
        Ok(id) => tracing::debug!(%id, symbol = %record.symbol, backend = store.backend_name(), "search recorded"),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(symbol = %record.symbol, error = %err, "failed to record search");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TopSearchesQuery {
    max_results: Option<usize>,
    population_size: Option<usize>,
}

impl TopSearchesQuery {
    fn options(&self, defaults: TopSearchesOptions) -> TopSearchesOptions {
        let mut opts = defaults.with_overrides(self.max_results, self.population_size);
        opts.population_size = opts.population_size.min(MAX_POPULATION_SIZE);
        opts
    }
}

async fn top_searches_fragment(
    State(state): State<AppState>,
    Query(query): Query<TopSearchesQuery>,
) -> Html<String> {
    let Some(store) = state.search_log.current().await else {
        return Html(html::top_searches_list(&[]));
    };

    match top_searches(store.as_ref(), query.options(state.top_searches)).await {
        Ok(symbols) => Html(html::top_searches_list(&symbols)),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "top searches query failed");
            Html(html::top_searches_error())
        }
    }
}

async fn top_searches_json(
    State(state): State<AppState>,
    Query(query): Query<TopSearchesQuery>,
) -> Result<Json<Vec<String>>, StatusCode> {
    let Some(store) = state.search_log.current().await else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let symbols = top_searches(store.as_ref(), query.options(state.top_searches))
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(symbols))
}
