//! One quote search: form decoding, provider lookup and fragment rendering.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::quote::Interval;
use crate::domain::search::{ClientInfo, SearchKind, SearchRecord, Symbol};
use crate::quotes::{HistoryRange, QuoteProvider, UnknownSymbolError};
use crate::render::chart::chart_json;
use crate::render::html;
use crate::time::form_date::parse_form_date;

/// Raw search form fields, as posted by the search page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchForm {
    #[serde(rename = "stockSymbol")]
    pub stock_symbol: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub interval: Option<String>,
    #[serde(rename = "quickSymbol")]
    pub quick_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    Quick {
        raw_symbol: String,
    },
    Historical {
        raw_symbol: String,
        start: Option<String>,
        end: Option<String>,
        interval: Option<String>,
    },
}

impl SearchRequest {
    /// A quick symbol takes precedence over a historical one; `None` when neither is set.
    pub fn from_form(form: SearchForm) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(raw_symbol) = present(form.quick_symbol) {
            return Some(SearchRequest::Quick { raw_symbol });
        }

        present(form.stock_symbol).map(|raw_symbol| SearchRequest::Historical {
            raw_symbol,
            start: form.start_date,
            end: form.end_date,
            interval: form.interval,
        })
    }

    pub fn raw_symbol(&self) -> &str {
        match self {
            SearchRequest::Quick { raw_symbol } | SearchRequest::Historical { raw_symbol, .. } => {
                raw_symbol
            }
        }
    }

    pub fn kind(&self) -> SearchKind {
        match self {
            SearchRequest::Quick { .. } => SearchKind::Quick,
            SearchRequest::Historical { .. } => SearchKind::Historical,
        }
    }

    fn history_range(&self) -> anyhow::Result<Option<HistoryRange>> {
        let SearchRequest::Historical {
            start,
            end,
            interval,
            ..
        } = self
        else {
            return Ok(None);
        };

        let start = parse_form_date(start.as_deref())?;
        let end = parse_form_date(end.as_deref())?;
        let interval = Interval::parse(interval.as_deref())?;
        Ok(Some(HistoryRange::new(start, end, interval)?))
    }

    /// Log row for this search; `None` when the symbol is not even syntactically valid.
    pub fn search_record(&self, client: ClientInfo, searched_at: DateTime<Utc>) -> Option<SearchRecord> {
        let symbol = Symbol::parse(self.raw_symbol()).ok()?;
        Some(SearchRecord::new(symbol, self.kind(), client, searched_at))
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub html: String,
    pub chart_json: Option<String>,

    /// Unexpected failure behind an error fragment, kept for error reporting.
    pub failure: Option<anyhow::Error>,
}

impl SearchOutcome {
    fn html(html: String) -> Self {
        Self {
            html,
            chart_json: None,
            failure: None,
        }
    }

    fn failed(err: anyhow::Error) -> Self {
        Self {
            html: html::ERROR_MESSAGE.to_string(),
            chart_json: None,
            failure: Some(err),
        }
    }

    /// Results fragment plus the embedded chart data, if any.
    pub fn fragment(&self) -> String {
        match &self.chart_json {
            Some(json) => format!("{}{}", self.html, html::chart_data_script(json)),
            None => self.html.clone(),
        }
    }
}

/// Runs one search against the provider. Failures are rendered, never returned.
pub async fn run_search(provider: &dyn QuoteProvider, request: &SearchRequest) -> SearchOutcome {
    let symbol = match Symbol::parse(request.raw_symbol()) {
        Ok(symbol) => symbol,
        Err(err) => {
            tracing::info!(raw_symbol = %request.raw_symbol(), error = %err, "rejected search symbol");
            return SearchOutcome::html(html::invalid_symbol(request.raw_symbol()));
        }
    };

    let range = match request.history_range() {
        Ok(range) => range,
        Err(err) => {
            tracing::warn!(%symbol, error = %err, "invalid historical search parameters");
            return SearchOutcome::html(html::ERROR_MESSAGE.to_string());
        }
    };

    let result = match range {
        None => provider
            .fetch_quote(&symbol)
            .await
            .map(|quote| SearchOutcome::html(html::quick_quote_table(&quote))),
        Some(range) => provider.fetch_history(&symbol, &range).await.map(|history| {
            let chart_json = (!history.bars.is_empty()).then(|| chart_json(&history));
            SearchOutcome {
                html: html::historical_table(&history),
                chart_json,
                failure: None,
            }
        }),
    };

    match result {
        Ok(outcome) => outcome,
        Err(err) if err.is::<UnknownSymbolError>() => {
            tracing::info!(%symbol, provider = provider.provider_name(), error = %err, "unknown symbol");
            SearchOutcome::html(html::invalid_symbol(symbol.as_str()))
        }
        Err(err) => {
            tracing::error!(%symbol, provider = provider.provider_name(), error = %err, "quote lookup failed");
            SearchOutcome::failed(err)
        }
    }
}
