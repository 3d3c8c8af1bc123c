//! tendies - ticker mention tracker for r/wallstreetbets
//!
//! This library fetches forum posts, extracts stock tickers from their text,
//! keeps a merged history per category and renders interactive charts.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Layered configuration
//! - [`error`] - Custom error types with rich context
//! - [`model`] - Records for each pipeline stage
//! - [`tickers`] - Ticker dictionary from exchange listings
//! - [`forum`] - Forum API trait and HTTP client
//! - [`fetch`] - Per-category fetching with raw audit tables
//! - [`extract`] - Ticker extraction from free text
//! - [`store`] - Curated tables and the incremental merge
//! - [`chart`] - Vega-Lite chart rendering
//! - [`html`] - HTML page rendering
//! - [`pipeline`] - The per-category pipeline

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod forum;
pub mod html;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod tickers;

pub use chart::ChartRenderer;
pub use cli::*;
pub use config::Config;
pub use error::{Result, ResultExt, TendiesError, format_error, format_tendies_error};
pub use extract::TickerExtractor;
pub use forum::{Credentials, ForumApi, RedditClient};
pub use model::*;
pub use pipeline::{Pipeline, RunOptions, select_categories};
pub use store::CuratedStore;
pub use tickers::TickerDictionary;

/// Standard width for dividers in CLI output
pub const DIVIDER_WIDTH: usize = 50;

/// Format an unsigned count with thousands separators.
#[must_use]
pub fn format_number(value: usize) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Join the top `n` tickers as `GME (120), AMC (80)`.
#[must_use]
pub fn format_top_tickers(tickers: &[TickerCount], n: usize) -> String {
    tickers
        .iter()
        .take(n)
        .map(|t| format!("{} ({})", t.ticker, format_number(t.count)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_adds_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345_678), "12,345,678");
    }

    #[test]
    fn format_top_tickers_truncates() {
        let tickers = vec![
            TickerCount {
                ticker: "GME".to_string(),
                count: 1200,
            },
            TickerCount {
                ticker: "AMC".to_string(),
                count: 80,
            },
            TickerCount {
                ticker: "BB".to_string(),
                count: 3,
            },
        ];
        assert_eq!(format_top_tickers(&tickers, 2), "GME (1,200), AMC (80)");
        assert_eq!(format_top_tickers(&[], 5), "");
    }
}
