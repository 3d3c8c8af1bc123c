//! Submission fetching: turns one category + sort into raw records.
//!
//! Every batch is written to a timestamped raw audit table before it is
//! handed on, so what the forum returned can always be inspected later.

use crate::error::Result;
use crate::forum::ForumApi;
use crate::model::{Category, RawRecord, SortOrder, TimeFilter};
use crate::store;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What to fetch for one sort of a category.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest {
    pub category: Category,
    pub sort: SortOrder,
    /// Falls back to the category's default window when `None`.
    pub time_filter: Option<TimeFilter>,
    /// Maximum submissions to retrieve; `None` means no bound.
    pub limit: Option<usize>,
}

/// Fetches raw records through a [`ForumApi`].
pub struct SubmissionFetcher<'a> {
    api: &'a dyn ForumApi,
    raw_dir: PathBuf,
    fetched_at: DateTime<Utc>,
}

impl<'a> SubmissionFetcher<'a> {
    /// `fetched_at` becomes every record's `last_updated` and names the raw files.
    pub fn new(api: &'a dyn ForumApi, raw_dir: impl Into<PathBuf>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            api,
            raw_dir: raw_dir.into(),
            fetched_at,
        }
    }

    /// Fetch one batch and persist its raw audit table.
    ///
    /// Categories that expand comments yield one record per comment.
    ///
    /// # Errors
    ///
    /// Returns a fetch error if any API call fails, or an IO error if the raw
    /// table cannot be written.
    pub fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawRecord>> {
        let spec = request.category.spec();
        let time_filter = request.time_filter.unwrap_or(spec.default_time_filter);

        let posts = match spec.query {
            Some(query) => self.api.search(query, request.sort, time_filter, request.limit)?,
            None => {
                let window = request.sort.takes_time_filter().then_some(time_filter);
                self.api.listing(request.sort, window, request.limit)?
            }
        };

        let mut records = Vec::with_capacity(posts.len());
        for post in &posts {
            if spec.expand_comments {
                let comments = self.api.comments(post)?;
                records.extend(comments.iter().map(|comment| {
                    RawRecord::from_comment(comment, post, request.sort, request.category, self.fetched_at)
                }));
            } else {
                records.push(RawRecord::from_post(
                    post,
                    request.sort,
                    request.category,
                    self.fetched_at,
                ));
            }
        }

        if records.is_empty() {
            warn!(category = %request.category, sort = %request.sort, "Fetch returned no records");
        }

        let path = self.raw_path(request.category, spec.query.unwrap_or(request.sort.as_str()));
        store::write_table(&path, &records)?;
        info!(
            category = %request.category,
            sort = %request.sort,
            submissions = posts.len(),
            records = records.len(),
            raw = %path.display(),
            "Fetched batch"
        );
        Ok(records)
    }

    /// `<raw>/YYYY/MM/DD/<Category>_<label>_<HHMMSS>.csv`
    fn raw_path(&self, category: Category, label: &str) -> PathBuf {
        raw_path(&self.raw_dir, category, label, self.fetched_at)
    }
}

pub(crate) fn raw_path(raw_dir: &Path, category: Category, label: &str, at: DateTime<Utc>) -> PathBuf {
    let label: String = label
        .chars()
        .map(|c| if matches!(c, ':' | '"' | ' ') { '_' } else { c })
        .collect();
    raw_dir
        .join(at.format("%Y/%m/%d").to_string())
        .join(format!("{}_{label}_{}.csv", category.name(), at.format("%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Post};
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl ForumApi for Recorder {
        fn search(
            &self,
            query: &str,
            sort: SortOrder,
            time_filter: TimeFilter,
            limit: Option<usize>,
        ) -> Result<Vec<Post>> {
            self.calls
                .borrow_mut()
                .push(format!("search {query} {sort} {time_filter} {limit:?}"));
            Ok(vec![Post {
                id: "p1".to_string(),
                title: "Daily Discussion Thread".to_string(),
                ..Post::default()
            }])
        }

        fn listing(
            &self,
            listing: SortOrder,
            time_filter: Option<TimeFilter>,
            limit: Option<usize>,
        ) -> Result<Vec<Post>> {
            self.calls
                .borrow_mut()
                .push(format!("listing {listing} {time_filter:?} {limit:?}"));
            Ok(vec![Post {
                id: format!("{listing}-1"),
                ..Post::default()
            }])
        }

        fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
            self.calls.borrow_mut().push(format!("comments {}", post.id));
            Ok(vec![
                Comment {
                    id: "c1".to_string(),
                    body: "GME".to_string(),
                    ..Comment::default()
                },
                Comment {
                    id: "c2".to_string(),
                    body: "AMC".to_string(),
                    ..Comment::default()
                },
            ])
        }
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 27, 14, 5, 9).unwrap()
    }

    #[test]
    fn raw_path_sanitizes_query() {
        let path = raw_path(
            Path::new("out/raw"),
            Category::DailyDiscussion,
            "flair:\"Daily Discussion\"",
            fetched_at(),
        );
        assert_eq!(
            path,
            PathBuf::from("out/raw/2021/01/27/DailyDiscussion_flair__Daily_Discussion__140509.csv")
        );
    }

    #[test]
    fn search_category_uses_default_window() {
        let dir = tempfile::tempdir().unwrap();
        let api = Recorder::default();
        let fetcher = SubmissionFetcher::new(&api, dir.path(), fetched_at());

        let records = fetcher
            .fetch(&FetchRequest {
                category: Category::DueDiligence,
                sort: SortOrder::Top,
                time_filter: None,
                limit: Some(10),
            })
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(api.calls.borrow()[0], "search flair:DD top week Some(10)");
        assert!(
            dir.path()
                .join("2021/01/27/DueDiligence_flair_DD_140509.csv")
                .exists()
        );
    }

    #[test]
    fn listing_without_window_drops_time_filter() {
        let dir = tempfile::tempdir().unwrap();
        let api = Recorder::default();
        let fetcher = SubmissionFetcher::new(&api, dir.path(), fetched_at());

        for sort in [SortOrder::New, SortOrder::Top] {
            fetcher
                .fetch(&FetchRequest {
                    category: Category::StockTicker,
                    sort,
                    time_filter: Some(TimeFilter::Month),
                    limit: None,
                })
                .unwrap();
        }

        let calls = api.calls.borrow();
        assert_eq!(calls[0], "listing new None None");
        assert_eq!(calls[1], "listing top Some(Month) None");
    }

    #[test]
    fn comment_categories_expand_to_comment_rows() {
        let dir = tempfile::tempdir().unwrap();
        let api = Recorder::default();
        let fetcher = SubmissionFetcher::new(&api, dir.path(), fetched_at());

        let records = fetcher
            .fetch(&FetchRequest {
                category: Category::DailyDiscussion,
                sort: SortOrder::New,
                time_filter: None,
                limit: None,
            })
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!(records.iter().all(|r| r.title == "Daily Discussion Thread"));
        assert!(records.iter().all(|r| r.last_updated == fetched_at()));
        assert_eq!(api.calls.borrow()[1], "comments p1");
    }
}
