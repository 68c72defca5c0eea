use anyhow::ensure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SYMBOL_LEN: usize = 12;

/// Normalized ticker symbol (trimmed, uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let symbol = raw.trim().to_ascii_uppercase();
        ensure!(!symbol.is_empty(), "symbol must be non-empty");
        ensure!(
            symbol.len() <= MAX_SYMBOL_LEN,
            "symbol must be at most {MAX_SYMBOL_LEN} characters (got {})",
            symbol.len()
        );
        ensure!(
            symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
            "symbol contains invalid characters: {symbol}"
        );
        ensure!(
            symbol.chars().any(|c| c.is_ascii_alphanumeric()),
            "symbol must contain a letter or digit: {symbol}"
        );
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Historical,
    Quick,
}

impl SearchKind {
    /// Value stored in `searches.type_of_search`.
    pub fn as_db_code(self) -> i16 {
        match self {
            SearchKind::Historical => 0,
            SearchKind::Quick => 1,
        }
    }

    pub fn from_db_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(SearchKind::Historical),
            1 => Some(SearchKind::Quick),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub device: String,
    pub family: String,
    pub family_version: String,
    pub os: String,
    pub os_version: String,
}

impl ClientInfo {
    pub fn unknown() -> Self {
        Self {
            device: "Unknown".to_string(),
            family: "Unknown".to_string(),
            family_version: "Unknown".to_string(),
            os: "Unknown".to_string(),
            os_version: "Unknown".to_string(),
        }
    }
}

/// One logged quote request. Built once per search and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub symbol: Symbol,
    pub kind: SearchKind,
    pub client: ClientInfo,
    pub searched_at: DateTime<Utc>,
    pub user_id: Option<i32>,
}

impl SearchRecord {
    pub fn new(symbol: Symbol, kind: SearchKind, client: ClientInfo, searched_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            kind,
            client,
            searched_at,
            user_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        let s = Symbol::parse("  brk-b ").unwrap();
        assert_eq!(s.as_str(), "BRK-B");
        assert_eq!(Symbol::parse("^gspc").unwrap().to_string(), "^GSPC");
    }

    #[test]
    fn symbol_rejects_bad_input() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse("AAPL;DROP").is_err());
        assert!(Symbol::parse("ABCDEFGHIJKLM").is_err());
        assert!(Symbol::parse("<b>").is_err());
        for punctuation_only in ["..", ".", "-", "=", "^", "^.-="] {
            assert!(Symbol::parse(punctuation_only).is_err(), "{punctuation_only}");
        }
        assert!(Symbol::parse("^GSPC").is_ok());
        assert!(Symbol::parse("EURUSD=X").is_ok());
    }

    #[test]
    fn symbol_deserializes_through_parse() {
        let s: Symbol = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(s.as_str(), "MSFT");
        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
    }

    #[test]
    fn search_kind_db_codes_round_trip() {
        for kind in [SearchKind::Historical, SearchKind::Quick] {
            assert_eq!(SearchKind::from_db_code(kind.as_db_code()), Some(kind));
        }
        assert_eq!(SearchKind::from_db_code(7), None);
    }
}
