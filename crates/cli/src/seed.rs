use chrono::{DateTime, Duration, Utc};
use stocksearch_core::domain::search::{ClientInfo, SearchKind, SearchRecord, Symbol};

const DEMO_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOG", "AMZN", "TSLA", "NVDA", "META", "^GSPC"];

const DEMO_CLIENTS: &[(&str, &str, &str, &str, &str)] = &[
    ("Mac", "Safari", "17_4", "Mac OS X", "10_15_7"),
    ("Other", "Chrome", "124_0_0", "Windows", "10"),
    ("iPhone", "Safari", "17_4", "iOS", "17_4_1"),
    ("Generic Smartphone", "Chrome", "124_0_6367", "Android", "14"),
];

/// Builds `count` demo searches ending at `now`, one minute apart.
///
/// Symbol `i` is drawn with a skewed weight so the top-searches report has a clear
/// leader; the same `count` and `now` always yield the same rows.
pub fn demo_searches(count: usize, now: DateTime<Utc>) -> anyhow::Result<Vec<SearchRecord>> {
    anyhow::ensure!(
        (1..=10_000).contains(&count),
        "seed count must be 1..=10000 (got {count})"
    );

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        // Stride 5 is coprime with the slot count, so every slot is visited.
        let slot = (i * 5) % (DEMO_SYMBOLS.len() * (DEMO_SYMBOLS.len() + 1) / 2);
        let symbol_idx = triangular_bucket(slot);
        let symbol = Symbol::parse(DEMO_SYMBOLS[symbol_idx])?;

        let kind = if i % 3 == 0 {
            SearchKind::Historical
        } else {
            SearchKind::Quick
        };

        let (device, family, family_version, os, os_version) = DEMO_CLIENTS[i % DEMO_CLIENTS.len()];
        let client = ClientInfo {
            device: device.to_string(),
            family: family.to_string(),
            family_version: family_version.to_string(),
            os: os.to_string(),
            os_version: os_version.to_string(),
        };

        let searched_at = now - Duration::minutes((count - i) as i64);
        out.push(SearchRecord::new(symbol, kind, client, searched_at));
    }

    Ok(out)
}

/// Maps 0..n(n+1)/2 onto 0..n so bucket `b` covers `n - b` slots.
fn triangular_bucket(slot: usize) -> usize {
    let n = DEMO_SYMBOLS.len();
    let mut remaining = slot;
    for bucket in 0..n {
        let width = n - bucket;
        if remaining < width {
            return bucket;
        }
        remaining -= width;
    }
    n - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_out_of_range_counts() {
        assert!(demo_searches(0, now()).is_err());
        assert!(demo_searches(10_001, now()).is_err());
    }

    #[test]
    fn rows_are_deterministic_and_chronological() {
        let a = demo_searches(50, now()).unwrap();
        let b = demo_searches(50, now()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.windows(2).all(|w| w[0].searched_at < w[1].searched_at));
        assert!(a.last().unwrap().searched_at < now());
        assert!(a.iter().all(|r| r.user_id.is_none()));
    }

    #[test]
    fn every_bucket_is_reachable() {
        let n = DEMO_SYMBOLS.len();
        let total = n * (n + 1) / 2;
        let mut seen = vec![0usize; n];
        for slot in 0..total {
            seen[triangular_bucket(slot)] += 1;
        }
        assert_eq!(seen[0], n);
        assert_eq!(seen[n - 1], 1);
    }

    #[test]
    fn full_cycle_uses_every_symbol_with_a_clear_leader() {
        let rows = demo_searches(36, now()).unwrap();
        let count = |s: &str| rows.iter().filter(|r| r.symbol.as_str() == s).count();
        assert_eq!(count("AAPL"), 8);
        assert_eq!(count("^GSPC"), 1);
        assert!(DEMO_SYMBOLS.iter().all(|s| count(s) > 0));
    }

    #[test]
    fn mixes_search_kinds() {
        let rows = demo_searches(6, now()).unwrap();
        let historical = rows.iter().filter(|r| r.kind == SearchKind::Historical).count();
        assert_eq!(historical, 2);
    }
}
