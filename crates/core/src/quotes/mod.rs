pub mod error;
pub mod provider;
pub mod types;

pub use error::UnknownSymbolError;
pub use provider::{HistoryRange, QuoteProvider, YahooChartProvider};
