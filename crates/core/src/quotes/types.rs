use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::domain::quote::{HistoricalBar, Quote, QuoteHistory};
use crate::domain::search::Symbol;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    pub currency: Option<String>,
    pub exchange_name: Option<String>,
    pub full_exchange_name: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub gmtoffset: Option<i64>,
    pub regular_market_price: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub regular_market_volume: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub eps_trailing_twelve_months: Option<f64>,
    pub trailing_annual_dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteIndicator>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteIndicator {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    fn name(&self, symbol: &Symbol) -> String {
        self.meta
            .long_name
            .as_deref()
            .or(self.meta.short_name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(symbol.as_str())
            .to_string()
    }

    fn exchange(&self) -> String {
        self.meta
            .full_exchange_name
            .as_deref()
            .or(self.meta.exchange_name.as_deref())
            .unwrap_or("N/A")
            .to_string()
    }

    /// Bars with a parseable timestamp, oldest first.
    pub fn bars(&self) -> Vec<HistoricalBar> {
        let quote = self.indicators.quote.first().cloned().unwrap_or_default();
        let offset = Duration::seconds(self.meta.gmtoffset.unwrap_or(0));

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &secs)| {
                let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)?;
                let date: NaiveDate = (timestamp + offset).date_naive();
                Some(HistoricalBar {
                    timestamp,
                    date,
                    open: at(&quote.open, i),
                    high: at(&quote.high, i),
                    low: at(&quote.low, i),
                    close: at(&quote.close, i),
                    volume: at(&quote.volume, i).map(to_count),
                })
            })
            .collect()
    }

    pub fn into_quote(self, symbol: Symbol) -> Quote {
        let bars = self.bars();
        let last = bars.last();
        let prior_close = bars.len().checked_sub(2).and_then(|i| bars[i].close);
        let meta = &self.meta;

        Quote {
            name: self.name(&symbol),
            exchange: self.exchange(),
            currency: meta.currency.clone(),
            price: meta.regular_market_price.or(last.and_then(|b| b.close)),
            open: last.and_then(|b| b.open),
            previous_close: prior_close
                .or(meta.previous_close)
                .or(meta.chart_previous_close),
            volume: meta
                .regular_market_volume
                .map(to_count)
                .or(last.and_then(|b| b.volume)),
            day_low: meta.regular_market_day_low.or(last.and_then(|b| b.low)),
            day_high: meta.regular_market_day_high.or(last.and_then(|b| b.high)),
            year_low: meta.fifty_two_week_low,
            year_high: meta.fifty_two_week_high,
            market_cap: meta.market_cap,
            shares_outstanding: meta.shares_outstanding.map(to_count),
            eps: meta.eps_trailing_twelve_months,
            dividend_yield: meta.trailing_annual_dividend_yield,
            symbol,
        }
    }

    pub fn into_history(self, symbol: Symbol) -> QuoteHistory {
        QuoteHistory {
            name: self.name(&symbol),
            exchange: self.exchange(),
            bars: self.bars(),
            symbol,
        }
    }
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().filter(|v| v.is_finite())
}

fn to_count(v: f64) -> u64 {
    v.max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> ChartResult {
        let v = json!({
            "meta": {
                "symbol": "AAPL",
                "currency": "USD",
                "exchangeName": "NMS",
                "fullExchangeName": "NasdaqGS",
                "longName": "Apple Inc.",
                "gmtoffset": -14400,
                "regularMarketPrice": 227.5,
                "regularMarketDayHigh": 229.0,
                "regularMarketDayLow": 225.1,
                "regularMarketVolume": 41000000,
                "fiftyTwoWeekHigh": 260.1,
                "fiftyTwoWeekLow": 164.08
            },
            "timestamp": [1760103000, 1760362200],
            "indicators": {
                "quote": [{
                    "open": [226.0, 227.0],
                    "high": [228.0, null],
                    "low": [224.0, 225.1],
                    "close": [225.0, 227.5],
                    "volume": [39000000, 41000000]
                }]
            }
        });
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn converts_meta_and_bars_into_quote() {
        let quote = sample_result().into_quote(Symbol::parse("AAPL").unwrap());
        assert_eq!(quote.name, "Apple Inc.");
        assert_eq!(quote.exchange, "NasdaqGS");
        assert_eq!(quote.price, Some(227.5));
        assert_eq!(quote.open, Some(227.0));
        assert_eq!(quote.previous_close, Some(225.0));
        assert_eq!(quote.volume, Some(41_000_000));
        assert_eq!(quote.year_low, Some(164.08));
        assert_eq!(quote.market_cap, None);
    }

    #[test]
    fn history_keeps_missing_values_as_none() {
        let history = sample_result().into_history(Symbol::parse("AAPL").unwrap());
        assert_eq!(history.bars.len(), 2);
        assert_eq!(history.bars[1].high, None);
        assert_eq!(history.bars[1].close, Some(227.5));
        // 2025-10-10 13:30 UTC is 09:30 in New York.
        assert_eq!(
            history.bars[0].date,
            NaiveDate::from_ymd_opt(2025, 10, 10).unwrap()
        );
    }

    #[test]
    fn name_falls_back_to_symbol() {
        let v = json!({ "meta": { "symbol": "XYZ" } });
        let result: ChartResult = serde_json::from_value(v).unwrap();
        let history = result.into_history(Symbol::parse("xyz").unwrap());
        assert_eq!(history.name, "XYZ");
        assert_eq!(history.exchange, "N/A");
        assert!(history.bars.is_empty());
    }
}
