use std::fmt;

/// The provider has no data for the requested symbol. Never retried.
#[derive(Debug, Clone)]
pub struct UnknownSymbolError {
    pub symbol: String,
    pub detail: String,
}

impl fmt::Display for UnknownSymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown symbol {}: {}", self.symbol, self.detail)
    }
}

impl std::error::Error for UnknownSymbolError {}
