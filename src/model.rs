//! Data models for collected forum data.
//!
//! Records move through three explicit stages:
//!
//! 1. [`RawRecord`] - one fetched post or comment, as written to the raw audit file
//! 2. [`ExtractedRecord`] - a raw record plus the tickers found in its text columns
//! 3. [`CuratedRecord`] - the persisted row of a category's curated dataset
//!
//! [`TickerMention`] is the transient chart-time row produced by exploding the
//! ticker lists of curated records.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Base URL used to build links back to the forum.
pub const FORUM_WEB_URL: &str = "https://www.reddit.com";

/// One post-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    DueDiligence,
    DailyDiscussion,
    StockTicker,
}

/// What a category fetches and which columns carry tickers.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    /// Search query; `None` means the category walks named listings instead.
    pub query: Option<&'static str>,
    /// Sort orders to fetch. Listing categories fetch one batch per listing.
    pub sorts: &'static [SortOrder],
    /// Time window used when the caller does not pass one.
    pub default_time_filter: TimeFilter,
    /// Text columns scanned for tickers.
    pub text_columns: &'static [TextColumn],
    /// Emit one record per comment instead of one per submission.
    pub expand_comments: bool,
}

impl Category {
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::StockTicker, Self::DueDiligence, Self::DailyDiscussion]
    }

    /// Name used for curated, raw and chart file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DueDiligence => "DueDiligence",
            Self::DailyDiscussion => "DailyDiscussion",
            Self::StockTicker => "StockTicker",
        }
    }

    /// Placeholder name of this category's chart in the HTML template.
    #[must_use]
    pub const fn template_slot(self) -> &'static str {
        match self {
            Self::DueDiligence => "due_diligence",
            Self::DailyDiscussion => "daily_discussion",
            Self::StockTicker => "stock_ticker",
        }
    }

    #[must_use]
    pub const fn spec(self) -> CategorySpec {
        match self {
            Self::DueDiligence => CategorySpec {
                query: Some("flair:DD"),
                sorts: &[SortOrder::Top],
                default_time_filter: TimeFilter::Week,
                text_columns: &[TextColumn::Title, TextColumn::Body],
                expand_comments: false,
            },
            Self::DailyDiscussion => CategorySpec {
                query: Some("flair:\"Daily Discussion\""),
                sorts: &[SortOrder::New],
                default_time_filter: TimeFilter::Day,
                text_columns: &[TextColumn::Body],
                expand_comments: true,
            },
            Self::StockTicker => CategorySpec {
                query: None,
                sorts: &[
                    SortOrder::Hot,
                    SortOrder::Top,
                    SortOrder::New,
                    SortOrder::Controversial,
                ],
                default_time_filter: TimeFilter::Day,
                text_columns: &[TextColumn::Title, TextColumn::Body],
                expand_comments: false,
            },
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort order for searches, or the listing name when no query is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Relevance,
    Hot,
    Top,
    New,
    Comments,
    Controversial,
    Rising,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Hot => "hot",
            Self::Top => "top",
            Self::New => "new",
            Self::Comments => "comments",
            Self::Controversial => "controversial",
            Self::Rising => "rising",
        }
    }

    /// Whether the listing of this name accepts a time window.
    ///
    /// Most-recent and trending listings have no meaningful window.
    #[must_use]
    pub const fn takes_time_filter(self) -> bool {
        !matches!(self, Self::Hot | Self::New | Self::Rising)
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window filter accepted by the forum API.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    All,
    Day,
    Hour,
    Month,
    Week,
    Year,
}

impl TimeFilter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Month => "month",
            Self::Week => "week",
            Self::Year => "year",
        }
    }
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text column that may carry tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColumn {
    Title,
    Body,
}

/// Whether a record came from a submission or one of its comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    Submission,
    Comment,
}

/// A submission as returned by the forum API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: String,
    /// Fullname, e.g. `t3_abc123`.
    pub name: String,
    pub title: String,
    pub selftext: String,
    pub author: Option<String>,
    pub score: i64,
    pub ups: i64,
    pub upvote_ratio: Option<f64>,
    pub num_comments: i64,
    pub link_flair_text: Option<String>,
    pub permalink: String,
    pub url: Option<String>,
    /// Creation time as epoch seconds on the forum's clock.
    pub created_utc: f64,
}

/// A comment as returned by the forum API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub body: String,
    pub author: Option<String>,
    pub score: i64,
    pub permalink: String,
    pub created_utc: f64,
    pub link_id: String,
    pub parent_id: String,
}

/// One fetched row, before ticker extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub kind: RecordKind,
    /// Submission title. Comments carry their submission's title.
    pub title: String,
    /// Submission self text or comment body.
    pub body: String,
    pub permalink: String,
    pub author: Option<String>,
    pub score: i64,
    pub upvote_ratio: Option<f64>,
    pub num_comments: Option<i64>,
    pub flair: Option<String>,
    pub url: Option<String>,
    pub created: DateTime<Utc>,
    pub sort: SortOrder,
    pub category: Category,
    pub last_updated: DateTime<Utc>,
}

impl RawRecord {
    /// Build a submission row.
    #[must_use]
    pub fn from_post(
        post: &Post,
        sort: SortOrder,
        category: Category,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: post.id.clone(),
            kind: RecordKind::Submission,
            title: post.title.clone(),
            body: post.selftext.clone(),
            permalink: post.permalink.clone(),
            author: post.author.clone(),
            score: post.score,
            upvote_ratio: post.upvote_ratio,
            num_comments: Some(post.num_comments),
            flair: post.link_flair_text.clone(),
            url: post.url.clone(),
            created: epoch_to_datetime(post.created_utc),
            sort,
            category,
            last_updated: fetched_at,
        }
    }

    /// Build a comment row under its submission.
    #[must_use]
    pub fn from_comment(
        comment: &Comment,
        post: &Post,
        sort: SortOrder,
        category: Category,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: comment.id.clone(),
            kind: RecordKind::Comment,
            title: post.title.clone(),
            body: comment.body.clone(),
            permalink: comment.permalink.clone(),
            author: comment.author.clone(),
            score: comment.score,
            upvote_ratio: None,
            num_comments: None,
            flair: post.link_flair_text.clone(),
            url: None,
            created: epoch_to_datetime(comment.created_utc),
            sort,
            category,
            last_updated: fetched_at,
        }
    }

    /// Text of the given column.
    #[must_use]
    pub fn text(&self, column: TextColumn) -> &str {
        match column {
            TextColumn::Title => &self.title,
            TextColumn::Body => &self.body,
        }
    }
}

/// A raw record with the tickers found in its designated text columns.
///
/// Columns that were not scanned hold empty lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub raw: RawRecord,
    pub title_tickers: Vec<String>,
    pub body_tickers: Vec<String>,
}

/// One row of a category's curated dataset, as persisted.
///
/// Timestamps are optional so rows from older or hand-edited files survive a
/// read even when a date cannot be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedRecord {
    pub id: String,
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "submission_text")]
    pub body: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub flair: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, with = "crate::store::lenient_datetime")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, with = "crate::store::lenient_datetime")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, rename = "title_ticker", with = "crate::store::ticker_list")]
    pub title_tickers: Vec<String>,
    #[serde(
        default,
        rename = "body_ticker",
        alias = "submission_text_ticker",
        with = "crate::store::ticker_list"
    )]
    pub body_tickers: Vec<String>,
}

impl CuratedRecord {
    /// Ticker list of the given column.
    #[must_use]
    pub fn tickers(&self, column: TextColumn) -> &[String] {
        match column {
            TextColumn::Title => &self.title_tickers,
            TextColumn::Body => &self.body_tickers,
        }
    }

    /// Label of the column a mention came from, as shown in charts.
    #[must_use]
    pub const fn source_label(&self, column: TextColumn) -> &'static str {
        match (column, self.kind) {
            (TextColumn::Title, _) => "title",
            (TextColumn::Body, RecordKind::Submission) => "submission",
            (TextColumn::Body, RecordKind::Comment) => "comment",
        }
    }
}

impl From<ExtractedRecord> for CuratedRecord {
    fn from(record: ExtractedRecord) -> Self {
        let raw = record.raw;
        Self {
            id: raw.id,
            kind: raw.kind,
            title: raw.title,
            body: raw.body,
            permalink: raw.permalink,
            author: raw.author,
            score: raw.score,
            upvote_ratio: raw.upvote_ratio,
            num_comments: raw.num_comments,
            flair: raw.flair,
            url: raw.url,
            created: Some(raw.created),
            sort: Some(raw.sort),
            category: Some(raw.category),
            last_updated: Some(raw.last_updated),
            title_tickers: record.title_tickers,
            body_tickers: record.body_tickers,
        }
    }
}

/// One (record, ticker, column) triple used only while charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerMention {
    pub id: String,
    pub ticker: String,
    /// Which column the ticker came from: `title`, `submission` or `comment`.
    pub source: &'static str,
    /// Title for submissions, body for comments.
    pub text: String,
    pub permalink: String,
    pub url: String,
    pub score: i64,
    pub created: DateTime<Utc>,
    pub date_str: String,
    pub date: String,
}

/// Aggregated mention count for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerCount {
    pub ticker: String,
    pub count: usize,
}

/// Summary of one category run.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub fetched: usize,
    pub curated: usize,
    pub mentions: usize,
    pub tickers: Vec<TickerCount>,
}

fn epoch_to_datetime(seconds: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation)]
    let secs = seconds.trunc() as i64;
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
