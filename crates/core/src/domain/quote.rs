use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::search::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Parses the form value; blank input means the default interval.
    pub fn parse(raw: Option<&str>) -> anyhow::Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        match raw.to_ascii_uppercase().as_str() {
            "DAILY" | "1D" => Ok(Interval::Daily),
            "WEEKLY" | "1WK" => Ok(Interval::Weekly),
            "MONTHLY" | "1MO" => Ok(Interval::Monthly),
            _ => anyhow::bail!("unsupported interval: {raw}"),
        }
    }

    /// Interval code understood by the chart API.
    pub fn chart_code(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }
}

/// Current price snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub name: String,
    pub exchange: String,
    pub currency: Option<String>,
    pub price: Option<f64>,
    pub open: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<u64>,
    pub day_low: Option<f64>,
    pub day_high: Option<f64>,
    pub year_low: Option<f64>,
    pub year_high: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<u64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteHistory {
    pub symbol: Symbol,
    pub name: String,
    pub exchange: String,
    pub bars: Vec<HistoricalBar>,
}
