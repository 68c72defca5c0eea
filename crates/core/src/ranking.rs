//! Frequency ranking of recently searched symbols.

use std::collections::HashMap;

const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_POPULATION_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopSearchesOptions {
    /// Maximum number of ranked symbols to return.
    pub max_results: usize,

    /// How many of the most recent search-log rows are sampled before ranking.
    pub population_size: usize,
}

impl Default for TopSearchesOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            population_size: DEFAULT_POPULATION_SIZE,
        }
    }
}

impl TopSearchesOptions {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Reads `TOP_SEARCHES_MAX_RESULTS` and `TOP_SEARCHES_POPULATION` through `var`;
    /// unset or unparsable values keep the defaults.
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut out = Self::default();

        if let Some(n) = var("TOP_SEARCHES_MAX_RESULTS").and_then(|s| s.trim().parse::<usize>().ok()) {
            out.max_results = n;
        }

        if let Some(n) = var("TOP_SEARCHES_POPULATION").and_then(|s| s.trim().parse::<usize>().ok()) {
            out.population_size = n;
        }

        out
    }

    /// Overrides the configured values with per-request ones when present.
    pub fn with_overrides(self, max_results: Option<usize>, population_size: Option<usize>) -> Self {
        Self {
            max_results: max_results.unwrap_or(self.max_results),
            population_size: population_size.unwrap_or(self.population_size),
        }
    }
}

/// Returns the distinct symbols of `sample` ordered by descending occurrence count,
/// capped at `max_results`.
///
/// Counts are kept in first-seen order and stably sorted ascending, then emitted from
/// the back. Symbols with equal counts therefore come out in reverse first-seen order.
pub fn rank_top_searches<S: AsRef<str>>(sample: &[S], max_results: usize) -> Vec<String> {
    if max_results == 0 || sample.is_empty() {
        return Vec::new();
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for symbol in sample {
        let symbol = symbol.as_ref();
        match index.get(symbol) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(symbol, counts.len());
                counts.push((symbol, 1));
            }
        }
    }

    counts.sort_by_key(|&(_, count)| count);

    counts
        .iter()
        .rev()
        .take(max_results)
        .map(|(symbol, _)| symbol.to_string())
        .collect()
}
