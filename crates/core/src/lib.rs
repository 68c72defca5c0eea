pub mod client_info;
pub mod domain;
pub mod quotes;
pub mod ranking;
pub mod render;
pub mod search;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_QUOTE_PROVIDER_BASE_URL: &str = "https://query1.finance.yahoo.com";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub quote_provider_base_url: Option<String>,
        pub database_refresh_secs: Option<u64>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let database_refresh_secs = match std::env::var("DATABASE_REFRESH_SECS") {
                Ok(s) if !s.trim().is_empty() => Some(
                    s.trim()
                        .parse::<u64>()
                        .with_context(|| format!("DATABASE_REFRESH_SECS is not a number: {s}"))?,
                ),
                _ => None,
            };

            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                quote_provider_base_url: non_empty_var("QUOTE_PROVIDER_BASE_URL"),
                database_refresh_secs: database_refresh_secs.filter(|secs| *secs > 0),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn quote_provider_base_url(&self) -> &str {
            self.quote_provider_base_url
                .as_deref()
                .unwrap_or(DEFAULT_QUOTE_PROVIDER_BASE_URL)
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
