use crate::domain::quote::QuoteHistory;

/// Closing prices as `[[epoch_millis, close], ...]` for the results chart.
pub fn chart_json(history: &QuoteHistory) -> String {
    let points: Vec<(i64, Option<f64>)> = history
        .bars
        .iter()
        .map(|bar| (bar.timestamp.timestamp_millis(), bar.close))
        .collect();

    serde_json::to_string(&points).unwrap_or_else(|_| "null".to_string())
}
