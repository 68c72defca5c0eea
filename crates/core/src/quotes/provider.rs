use crate::config::Settings;
use crate::domain::quote::{Interval, Quote, QuoteHistory};
use crate::domain::search::Symbol;
use crate::quotes::error::UnknownSymbolError;
use crate::quotes::types::{ChartResponse, ChartResult};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const CHART_PATH: &str = "/v8/finance/chart";
const QUICK_QUOTE_RANGE: &str = "5d";
const CLIENT_USER_AGENT: &str = concat!("stocksearch/", env!("CARGO_PKG_VERSION"));

/// Inclusive date range for a historical lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

impl HistoryRange {
    pub fn new(start: NaiveDate, end: NaiveDate, interval: Interval) -> Result<Self> {
        anyhow::ensure!(
            start <= end,
            "start date {start} must not be after end date {end}"
        );
        anyhow::ensure!(end.succ_opt().is_some(), "end date {end} is out of range");
        Ok(Self {
            start,
            end,
            interval,
        })
    }

    /// `period1`/`period2` epoch seconds; the end day is included.
    fn epoch_bounds(&self) -> (i64, i64) {
        let start = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = self
            .end
            .succ_opt()
            .unwrap_or(self.end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        (start.timestamp(), end.timestamp())
    }
}

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote>;

    async fn fetch_history(&self, symbol: &Symbol, range: &HistoryRange) -> Result<QuoteHistory>;
}

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    backoff_base: Duration,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.quote_provider_base_url().to_string();

        let timeout_secs = std::env::var("QUOTE_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("QUOTE_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .clamp(1, MAX_RETRIES);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build quote provider http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
            backoff_base: BACKOFF_BASE,
        })
    }

    fn url(&self, symbol: &Symbol) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            CHART_PATH,
            symbol
        )
    }

    async fn fetch_once(&self, symbol: &Symbol, query: &[(&str, String)]) -> Result<ChartResult> {
        let res = self
            .http
            .get(self.url(symbol))
            .query(query)
            .send()
            .await
            .context("quote provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read quote provider response")?;

        decode_chart(symbol, status, &text)
    }

    async fn fetch_chart(&self, symbol: &Symbol, query: Vec<(&str, String)>) -> Result<ChartResult> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(symbol, &query).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if err.is::<UnknownSymbolError>() || attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_delay(self.backoff_base, attempt);
                    tracing::warn!(attempt, ?backoff, %symbol, error = %err, "quote fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let query = vec![
            ("range", QUICK_QUOTE_RANGE.to_string()),
            ("interval", Interval::Daily.chart_code().to_string()),
        ];
        let result = self.fetch_chart(symbol, query).await?;
        Ok(result.into_quote(symbol.clone()))
    }

    async fn fetch_history(&self, symbol: &Symbol, range: &HistoryRange) -> Result<QuoteHistory> {
        let (period1, period2) = range.epoch_bounds();
        let query = vec![
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", range.interval.chart_code().to_string()),
            ("events", "history".to_string()),
        ];
        let result = self.fetch_chart(symbol, query).await?;
        Ok(result.into_history(symbol.clone()))
    }
}

/// `base * 2^(attempt - 1)`, saturating.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Interprets one chart API response body.
fn decode_chart(symbol: &Symbol, status: StatusCode, text: &str) -> Result<ChartResult> {
    let parsed = serde_json::from_str::<ChartResponse>(text);

    if let Ok(body) = &parsed {
        if let Some(err) = &body.chart.error {
            if err.code.eq_ignore_ascii_case("Not Found") {
                return Err(UnknownSymbolError {
                    symbol: symbol.to_string(),
                    detail: err.description.clone().unwrap_or_else(|| err.code.clone()),
                }
                .into());
            }
            anyhow::bail!(
                "quote provider HTTP {status}: {} ({})",
                err.code,
                err.description.as_deref().unwrap_or("no description")
            );
        }
    }

    if !status.is_success() {
        anyhow::bail!("quote provider HTTP {status}: {text}");
    }

    let body = parsed.with_context(|| format!("quote provider response is not valid chart JSON: {text}"))?;
    let result = body
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| UnknownSymbolError {
            symbol: symbol.to_string(),
            detail: "no chart data returned".to_string(),
        })?;

    anyhow::ensure!(
        result.meta.symbol.eq_ignore_ascii_case(symbol.as_str()),
        "quote provider symbol mismatch: expected {symbol}, got {}",
        result.meta.symbol
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[test]
    fn decodes_successful_chart() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "regularMarketPrice": 227.5 },
                    "timestamp": [1760103000],
                    "indicators": { "quote": [{ "close": [225.0] }] }
                }],
                "error": null
            }
        })
        .to_string();

        let result = decode_chart(&aapl(), StatusCode::OK, &body).unwrap();
        assert_eq!(result.meta.regular_market_price, Some(227.5));
        assert_eq!(result.bars().len(), 1);
    }

    #[test]
    fn not_found_maps_to_unknown_symbol() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        })
        .to_string();

        let err = decode_chart(&aapl(), StatusCode::NOT_FOUND, &body).unwrap_err();
        let unknown = err.downcast_ref::<UnknownSymbolError>().unwrap();
        assert_eq!(unknown.symbol, "AAPL");
        assert!(unknown.detail.contains("delisted"));
    }

    #[test]
    fn empty_result_maps_to_unknown_symbol() {
        let body = json!({ "chart": { "result": [], "error": null } }).to_string();
        let err = decode_chart(&aapl(), StatusCode::OK, &body).unwrap_err();
        assert!(err.is::<UnknownSymbolError>());
    }

    #[test]
    fn server_errors_are_plain_errors() {
        let err = decode_chart(&aapl(), StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(!err.is::<UnknownSymbolError>());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn other_chart_errors_are_plain_errors() {
        let body = json!({
            "chart": { "result": null, "error": { "code": "Bad Request", "description": "Invalid input" } }
        })
        .to_string();
        let err = decode_chart(&aapl(), StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert!(!err.is::<UnknownSymbolError>());
    }

    #[test]
    fn rejects_symbol_mismatch() {
        let body = json!({
            "chart": { "result": [{ "meta": { "symbol": "MSFT" } }], "error": null }
        })
        .to_string();
        assert!(decode_chart(&aapl(), StatusCode::OK, &body).is_err());
    }

    #[test]
    fn history_range_is_end_inclusive() {
        let range = HistoryRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            Interval::Daily,
        )
        .unwrap();
        let (p1, p2) = range.epoch_bounds();
        assert_eq!(p1, 1_704_153_600);
        assert_eq!(p2, 1_704_499_200);
    }

    #[test]
    fn history_range_rejects_inverted_dates() {
        let res = HistoryRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Interval::Weekly,
        );
        assert!(res.is_err());
    }

    #[test]
    fn history_range_rejects_last_representable_end_date() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(HistoryRange::new(start, NaiveDate::MAX, Interval::Daily).is_err());

        let range = HistoryRange {
            start,
            end: NaiveDate::MAX,
            interval: Interval::Daily,
        };
        let (p1, p2) = range.epoch_bounds();
        assert!(p2 > p1);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, 200), Duration::from_secs(u64::from(u32::MAX)));
    }

    async fn spawn_chart_stub(status: StatusCode, body: String) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/v8/finance/chart/:symbol",
            axum::routing::get(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn provider_for(base_url: String, retries: u32) -> YahooChartProvider {
        YahooChartProvider {
            http: reqwest::Client::new(),
            base_url,
            retries,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn unknown_symbol_is_fetched_once() {
        let body = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found" } }
        })
        .to_string();
        let (base_url, hits) = spawn_chart_stub(StatusCode::NOT_FOUND, body).await;

        let err = provider_for(base_url, 4).fetch_quote(&aapl()).await.unwrap_err();
        assert!(err.is::<UnknownSymbolError>());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_limit() {
        let (base_url, hits) = spawn_chart_stub(StatusCode::BAD_GATEWAY, "bad gateway".to_string()).await;

        let err = provider_for(base_url, 3).fetch_quote(&aapl()).await.unwrap_err();
        assert!(!err.is::<UnknownSymbolError>());
        assert!(err.to_string().contains("502"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn successful_fetch_stops_after_first_request() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "regularMarketPrice": 227.5 },
                    "timestamp": [1760103000],
                    "indicators": { "quote": [{ "close": [225.0] }] }
                }],
                "error": null
            }
        })
        .to_string();
        let (base_url, hits) = spawn_chart_stub(StatusCode::OK, body).await;

        let quote = provider_for(base_url, 3).fetch_quote(&aapl()).await.unwrap();
        assert_eq!(quote.price, Some(227.5));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
