//! One shared pipeline for every category.
//!
//! fetch (per sort) -> extract -> merge into curated store -> chart.
//! Categories run sequentially and each owns its own curated and chart
//! files, so a failure in one category never touches another's output.

use crate::chart::{ChartRenderer, RenderedChart};
use crate::config::Config;
use crate::error::{Result, TendiesError};
use crate::extract::TickerExtractor;
use crate::fetch::{FetchRequest, SubmissionFetcher};
use crate::forum::ForumApi;
use crate::logging::OperationGuard;
use crate::model::{Category, CategoryReport, CuratedRecord, TimeFilter};
use crate::store::{self, CuratedStore};
use crate::tickers::TickerDictionary;
use chrono::{DateTime, Utc};
use tracing::info;

/// Caller-chosen fetch options shared by every category of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Overrides each category's default time window.
    pub time_filter: Option<TimeFilter>,
    pub limit: Option<usize>,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    dictionary: &'a TickerDictionary,
    renderer: ChartRenderer,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a Config, dictionary: &'a TickerDictionary) -> Self {
        Self {
            config,
            dictionary,
            renderer: ChartRenderer::new(config.chart.clone()),
        }
    }

    fn store(&self, category: Category) -> CuratedStore {
        CuratedStore::new(&self.config.curated_dir(), category)
    }

    /// Fetch, extract, merge and chart one category.
    ///
    /// # Errors
    ///
    /// Returns a fetch error if the forum API fails, or an IO error if the
    /// curated table or chart cannot be written.
    pub fn run_category(
        &self,
        api: &dyn ForumApi,
        category: Category,
        options: RunOptions,
        fetched_at: DateTime<Utc>,
    ) -> Result<CategoryReport> {
        let guard = OperationGuard::new(format!("collect {category}"));
        let result = self.collect(api, category, options, fetched_at);
        match &result {
            Ok(_) => guard.complete(),
            Err(e) => guard.fail(e),
        }
        result
    }

    fn collect(
        &self,
        api: &dyn ForumApi,
        category: Category,
        options: RunOptions,
        fetched_at: DateTime<Utc>,
    ) -> Result<CategoryReport> {
        let spec = category.spec();
        let fetcher = SubmissionFetcher::new(api, self.config.raw_dir(), fetched_at);

        let mut raw = Vec::new();
        for &sort in spec.sorts {
            raw.extend(fetcher.fetch(&FetchRequest {
                category,
                sort,
                time_filter: options.time_filter,
                limit: options.limit,
            })?);
        }
        let fetched = raw.len();

        let extractor = TickerExtractor::new(self.dictionary);
        let batch: Vec<CuratedRecord> = extractor
            .extract_all(raw, spec.text_columns)
            .into_iter()
            .map(CuratedRecord::from)
            .collect();

        let merged = self.store(category).merge_batch(batch, self.dictionary)?;
        let chart = self
            .renderer
            .write(category, &merged, &self.config.semantic_dir())?;
        Ok(report(category, fetched, merged.len(), chart))
    }

    /// Redraw a category's chart from its curated table without fetching.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::PersistenceRead`] if there is no curated table.
    pub fn rechart(&self, category: Category) -> Result<CategoryReport> {
        let rows = store::clean(self.store(category).read()?, self.dictionary);
        let chart = self
            .renderer
            .write(category, &rows, &self.config.semantic_dir())?;
        info!(%category, rows = rows.len(), "Chart redrawn from curated table");
        Ok(report(category, 0, rows.len(), chart))
    }

    /// Clean a category's curated table in place.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::PersistenceRead`] if there is no curated table.
    pub fn clean_category(&self, category: Category) -> Result<usize> {
        let rows = self.store(category).clean_in_place(self.dictionary)?;
        info!(%category, rows, "Curated table cleaned");
        Ok(rows)
    }
}

fn report(category: Category, fetched: usize, curated: usize, chart: RenderedChart) -> CategoryReport {
    CategoryReport {
        category,
        fetched,
        curated,
        mentions: chart.mentions,
        tickers: chart.tickers,
    }
}

/// Categories picked on the command line.
///
/// # Errors
///
/// Returns [`TendiesError::InvalidArgument`] when nothing is selected.
pub fn select_categories(
    all: bool,
    stock_ticker: bool,
    due_diligence: bool,
    daily_discussion: bool,
) -> Result<Vec<Category>> {
    if all {
        return Ok(Category::all().to_vec());
    }
    let picked: Vec<Category> = Category::all()
        .into_iter()
        .filter(|c| match c {
            Category::StockTicker => stock_ticker,
            Category::DueDiligence => due_diligence,
            Category::DailyDiscussion => daily_discussion,
        })
        .collect();
    if picked.is_empty() {
        return Err(TendiesError::invalid_argument("no categories selected"));
    }
    Ok(picked)
}
