//! Chart rendering: curated rows to a Vega-Lite specification.
//!
//! The chart is a bar chart of mention counts per ticker stacked above a
//! ranked detail table. Clicking a bar filters the table to that ticker;
//! date inputs and count sliders narrow both views.

use crate::config::ChartConfig;
use crate::error::{Result, ResultExt};
use crate::model::{
    Category, CuratedRecord, FORUM_WEB_URL, RecordKind, TextColumn, TickerCount, TickerMention,
};
use itertools::Itertools;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATE_FILTER: &str = "datum.date >= start_date && datum.date <= end_date";

/// A rendered chart with the numbers that went into it.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub spec: Value,
    /// Mentions left after thresholding.
    pub mentions: usize,
    /// Charted tickers, most mentioned first.
    pub tickers: Vec<TickerCount>,
}

/// Builds chart specifications from curated datasets.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    config: ChartConfig,
}

impl ChartRenderer {
    #[must_use]
    pub const fn new(config: ChartConfig) -> Self {
        Self { config }
    }

    /// Explode ticker lists into one mention per (record, ticker).
    ///
    /// Empty tickers and rows without a creation date are dropped. A ticker
    /// found in both columns of one record counts once, attributed to the
    /// first column in `columns`.
    #[must_use]
    pub fn mentions(rows: &[CuratedRecord], columns: &[TextColumn]) -> Vec<TickerMention> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut mentions = Vec::new();

        for &column in columns {
            for row in rows {
                let Some(created) = row.created else {
                    continue;
                };
                for ticker in row.tickers(column) {
                    let ticker = ticker.trim();
                    if ticker.is_empty() || !seen.insert((row.id.clone(), ticker.to_string())) {
                        continue;
                    }
                    let text = match row.kind {
                        RecordKind::Comment => &row.body,
                        RecordKind::Submission => &row.title,
                    };
                    mentions.push(TickerMention {
                        id: row.id.clone(),
                        ticker: ticker.to_string(),
                        source: row.source_label(column),
                        text: text.clone(),
                        permalink: row.permalink.clone(),
                        url: format!("{FORUM_WEB_URL}{}", row.permalink),
                        score: row.score,
                        created,
                        date_str: created.format("%Y-%m-%d %H:%M").to_string(),
                        date: created.format("%Y-%m-%d").to_string(),
                    });
                }
            }
        }
        mentions
    }

    /// Mentions per ticker, most mentioned first, ties by ticker name.
    #[must_use]
    pub fn count_tickers(mentions: &[TickerMention]) -> Vec<TickerCount> {
        mentions
            .iter()
            .map(|m| m.ticker.as_str())
            .counts()
            .into_iter()
            .map(|(ticker, count)| TickerCount {
                ticker: ticker.to_string(),
                count,
            })
            .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ticker.cmp(&b.ticker)))
            .collect()
    }

    /// Keep mentions of tickers mentioned strictly more than `min` times.
    #[must_use]
    pub fn filter_by_min_mentions(mentions: Vec<TickerMention>, min: usize) -> Vec<TickerMention> {
        let keep: HashSet<String> = Self::count_tickers(&mentions)
            .into_iter()
            .filter(|c| c.count > min)
            .map(|c| c.ticker)
            .collect();
        mentions.into_iter().filter(|m| keep.contains(&m.ticker)).collect()
    }

    /// Build the chart for one category.
    #[must_use]
    pub fn render(&self, category: Category, rows: &[CuratedRecord]) -> RenderedChart {
        let columns = category.spec().text_columns;
        let min = self.config.min_mentions_for(category);
        let mentions = Self::filter_by_min_mentions(Self::mentions(rows, columns), min);
        let tickers = Self::count_tickers(&mentions);
        debug!(%category, min, mentions = mentions.len(), tickers = tickers.len(), "Chart data ready");

        RenderedChart {
            spec: self.build_spec(&mentions, &tickers),
            mentions: mentions.len(),
            tickers,
        }
    }

    /// Render and write `<semantic_dir>/<Category>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(
        &self,
        category: Category,
        rows: &[CuratedRecord],
        semantic_dir: &Path,
    ) -> Result<RenderedChart> {
        let chart = self.render(category, rows);
        let path = chart_path(semantic_dir, category);
        std::fs::create_dir_all(semantic_dir).with_path("create", semantic_dir)?;
        std::fs::write(&path, serde_json::to_string(&chart.spec)?).with_path("write", &path)?;
        info!(%category, path = %path.display(), tickers = chart.tickers.len(), "Chart written");
        Ok(chart)
    }

    fn build_spec(&self, mentions: &[TickerMention], tickers: &[TickerCount]) -> Value {
        let max_count = tickers.first().map_or(0, |t| t.count);
        let start = mentions.iter().map(|m| m.date.as_str()).min().unwrap_or_default();
        let end = mentions.iter().map(|m| m.date.as_str()).max().unwrap_or_default();

        let count_slider = |name: &str, value: usize, label: &str| {
            json!({
                "name": name,
                "value": value,
                "bind": {"input": "range", "min": 0, "max": max_count, "step": 1, "name": label}
            })
        };

        let bars = json!({
            "data": {"name": "mentions"},
            "params": [{"name": "ticker_select", "select": {"type": "point", "fields": ["ticker"]}}],
            "transform": [
                {"filter": DATE_FILTER},
                {"aggregate": [{"op": "count", "as": "count"}], "groupby": ["ticker"]},
                {"filter": "datum.count >= min_count && datum.count <= max_count"}
            ],
            "mark": "bar",
            "encoding": {
                "x": {"field": "ticker", "type": "nominal", "sort": "-y", "axis": {"title": "Stock Tickers"}},
                "y": {"field": "count", "type": "quantitative", "axis": {"title": "Number of Mentions"}},
                "color": {
                    "condition": {"param": "ticker_select", "field": "ticker", "type": "nominal", "legend": null},
                    "value": "lightgray"
                },
                "tooltip": [
                    {"field": "ticker", "type": "nominal"},
                    {"field": "count", "type": "quantitative"}
                ]
            },
            "width": self.config.width,
            "height": self.config.height
        });

        let table = json!({
            "hconcat": [
                self.table_column("date_str", "Created Date", 100),
                self.table_column("ticker", "Stock Ticker", 60),
                self.table_column("score", "Upvotes", 50),
                self.table_column("text", "Title/Comment", 600),
            ]
        });

        json!({
            "$schema": format!("https://vega.github.io/schema/vega-lite/v{}.json", self.config.vega_lite_version),
            "config": {"view": {"continuousWidth": 400, "continuousHeight": 300}},
            "usermeta": {
                "embedOptions": {
                    "theme": self.config.theme,
                    "loader": {"target": self.config.link_target}
                }
            },
            "datasets": {"mentions": mentions},
            "params": [
                {"name": "start_date", "value": start, "bind": {"input": "date", "name": "Start "}},
                {"name": "end_date", "value": end, "bind": {"input": "date", "name": "End "}},
                count_slider("min_count", 0, "Min mentions "),
                count_slider("max_count", max_count, "Max mentions "),
            ],
            "vconcat": [bars, table],
            "resolve": {"legend": {"color": "independent"}}
        })
    }

    fn table_column(&self, field: &str, title: &str, width: u32) -> Value {
        json!({
            "title": title,
            "data": {"name": "mentions"},
            "transform": [
                {"filter": DATE_FILTER},
                {"filter": {"param": "ticker_select"}},
                {
                    "window": [{"op": "row_number", "as": "row_number"}],
                    "sort": [
                        {"field": "score", "order": "descending"},
                        {"field": "created", "order": "descending"}
                    ]
                },
                {"filter": format!("datum.row_number <= {}", self.config.table_rows)}
            ],
            "mark": {"type": "text", "align": "left", "dx": -45},
            "encoding": {
                "y": {"field": "row_number", "type": "ordinal", "axis": null},
                "text": {"field": field, "type": "nominal"},
                "href": {"field": "url", "type": "nominal"},
                "tooltip": [{"field": "url", "type": "nominal"}]
            },
            "width": width,
            "height": 300
        })
    }
}

/// `<semantic_dir>/<Category>.json`
#[must_use]
pub fn chart_path(semantic_dir: &Path, category: Category) -> PathBuf {
    semantic_dir.join(format!("{}.json", category.name()))
}
