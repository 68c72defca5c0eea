//! HTML fragments returned to the search page.
//!
//! Fragments are table rows and cards that the page drops into its results container,
//! so none of them carry `<html>`/`<body>` wrappers.

use std::fmt::Write;

use crate::domain::quote::{Quote, QuoteHistory};
use crate::render::format::{count, escape_html, grouped, money, ratio, whole, NOT_AVAILABLE};

pub const NO_RESULTS: &str = "<tr><td>No results were found</td></tr>";
pub const ERROR_MESSAGE: &str = "<tr><td>An error occurred. Please try again.</td></tr>";
const CLOSING_TAGS: &str = "</tbody></table>\n</div> <!--End Card-Body-->";

pub fn invalid_symbol(raw: &str) -> String {
    format!(
        "<tr><td>{}  is an invalid stock symbol.</td></tr>",
        escape_html(&raw.trim().to_uppercase())
    )
}

fn card_header(name: &str, exchange: &str, symbol: &str) -> String {
    format!(
        "<div class=\"card card-header\"><h2>{}</h2><h5>{}: {}</h5> <br></div> <!--End card header-->",
        escape_html(name),
        escape_html(exchange),
        escape_html(symbol)
    )
}

pub fn quick_quote_table(quote: &Quote) -> String {
    let mut out = card_header(&quote.name, &quote.exchange, quote.symbol.as_str());
    out.push_str("<div class=\"card card-body\"><table class=\"table\"><tbody>");

    let dividend = quote
        .dividend_yield
        .filter(|v| v.is_finite())
        .map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}%", v * 100.0));

    // Infallible: writing into a String.
    let _ = write!(
        out,
        "<h3>{price}</h3>\
         <tr><td>Open: {open}</td><td>Previous Close: {prev}</td><td>Volume: {volume}</td></tr>\
         <tr><td>Day's Range: {day_low} - {day_high}</td><td>52 Week Range: {year_low} - {year_high}</td>\
         <td>Market Cap: {market_cap}</td></tr>\
         <tr><td>Dividend Yield: {dividend}</td><td>Shares Outstanding: {shares}</td>\
         <td>EPS: {eps}</td></tr><tr></tr>",
        price = money(quote.price),
        open = money(quote.open),
        prev = money(quote.previous_close),
        volume = count(quote.volume),
        day_low = money(quote.day_low),
        day_high = money(quote.day_high),
        year_low = money(quote.year_low),
        year_high = money(quote.year_high),
        market_cap = whole(quote.market_cap),
        shares = count(quote.shares_outstanding),
        eps = ratio(quote.eps),
    );

    out.push_str(CLOSING_TAGS);
    out
}

pub fn historical_table(history: &QuoteHistory) -> String {
    if history.bars.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = card_header(&history.name, &history.exchange, history.symbol.as_str());
    out.push_str(
        "<div class=\"card card-body\"><table class=\"table table-hover\">\
         <thead id=\"tableHead\"><tr><th>Date</th><th>Open</th><th>High</th><th>Low</th>\
         <th>Close</th><th>Volume</th></tr></thead><tbody>",
    );

    for bar in &history.bars {
        let price = |v: Option<f64>| grouped(v.unwrap_or(0.0), 2);
        let _ = write!(
            out,
            "<tr class=\"results-table\"><td>{}</td><td>$ {}</td><td>$ {}</td><td>$ {}</td>\
             <td>$ {}</td><td>{}</td></tr>",
            bar.date.format("%m/%d/%Y"),
            price(bar.open),
            price(bar.high),
            price(bar.low),
            price(bar.close),
            grouped(bar.volume.unwrap_or(0) as f64, 0),
        );
    }

    out.push_str(CLOSING_TAGS);
    out.push_str("<br>");
    out
}

pub fn top_searches_list(symbols: &[String]) -> String {
    let mut out = String::from("<ul class=\"list-group\" id=\"topSearches\">");
    if symbols.is_empty() {
        out.push_str("<li class=\"list-group-item\">No searches yet</li>");
    }
    for symbol in symbols {
        let _ = write!(
            out,
            "<li class=\"list-group-item\">{}</li>",
            escape_html(symbol)
        );
    }
    out.push_str("</ul>");
    out
}

pub fn top_searches_error() -> String {
    "<ul class=\"list-group\" id=\"topSearches\"><li class=\"list-group-item\">Error</li></ul>"
        .to_string()
}

/// Embeds chart points next to a historical table.
pub fn chart_data_script(chart_json: &str) -> String {
    format!(
        "<script type=\"application/json\" id=\"historyChartData\">{}</script>",
        chart_json.replace("</", "<\\/")
    )
}
