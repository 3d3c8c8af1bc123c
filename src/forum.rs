//! Forum API access.
//!
//! [`ForumApi`] is the seam the fetcher talks to. [`RedditClient`] is the
//! HTTP implementation: OAuth refresh-token grant, paged listings and search,
//! and comment trees with their collapsed "more" branches expanded.

use crate::config::ForumConfig;
use crate::error::{Result, TendiesError};
use crate::model::{Comment, Post, SortOrder, TimeFilter};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Largest page the API serves and largest `morechildren` batch it accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Read access to one community on the forum.
pub trait ForumApi {
    /// Search the community. `limit` of `None` pages until the results end.
    ///
    /// # Errors
    ///
    /// Returns a fetch error on any failed request.
    fn search(
        &self,
        query: &str,
        sort: SortOrder,
        time_filter: TimeFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Post>>;

    /// Walk a named listing (`hot`, `new`, `top`, ...).
    ///
    /// # Errors
    ///
    /// Returns a fetch error on any failed request.
    fn listing(
        &self,
        listing: SortOrder,
        time_filter: Option<TimeFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Post>>;

    /// Every comment under `post`, depth-first, with collapsed branches expanded.
    ///
    /// # Errors
    ///
    /// Returns a fetch error on any failed request.
    fn comments(&self, post: &Post) -> Result<Vec<Comment>>;
}

/// OAuth credentials for a script-type app.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub user_agent: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::Credentials`] if the file is missing, is not
    /// valid JSON, or leaves a field empty.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TendiesError::credentials(path, e.to_string()))?;
        let credentials: Self = serde_json::from_str(&content)
            .map_err(|e| TendiesError::credentials(path, e.to_string()))?;

        let fields = [
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
            ("refresh_token", &credentials.refresh_token),
            ("user_agent", &credentials.user_agent),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(TendiesError::credentials(path, format!("'{name}' is empty")));
        }
        Ok(credentials)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

/// A tagged API object; `data` is decoded once `kind` is known.
#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// A collapsed branch. With no `children` it is a "continue this thread"
/// link whose replies hang off `parent_id`.
#[derive(Debug, Default, Deserialize)]
struct MoreData {
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    parent_id: String,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    #[serde(default)]
    data: MoreChildrenData,
}

#[derive(Debug, Default, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<Thing>,
}

fn decode<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| TendiesError::api_response(format!("bad {kind}: {e}")))
}

fn posts_from(children: Vec<Thing>) -> Result<Vec<Post>> {
    children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .map(|thing| decode("submission", thing.data))
        .collect()
}

/// Collects comments in depth-first order and the ids of collapsed branches.
#[derive(Debug, Default)]
struct CommentWalk {
    comments: Vec<Comment>,
    seen: HashSet<String>,
    /// Comment ids to request through `morechildren`.
    pending: Vec<String>,
    /// Comments whose replies were cut off by a "continue this thread" link.
    threads: Vec<String>,
}

impl CommentWalk {
    fn visit(&mut self, things: Vec<Thing>) -> Result<()> {
        for thing in things {
            match thing.kind.as_str() {
                "t1" => {
                    let replies = thing
                        .data
                        .get("replies")
                        .filter(|r| r.is_object())
                        .cloned();
                    let comment: Comment = decode("comment", thing.data)?;
                    if self.seen.insert(comment.id.clone()) {
                        self.comments.push(comment);
                    }
                    if let Some(replies) = replies {
                        let listing: Listing = decode("reply listing", replies)?;
                        self.visit(listing.data.children)?;
                    }
                }
                "more" => {
                    let more: MoreData = decode("more placeholder", thing.data)?;
                    if more.children.is_empty() {
                        if let Some(parent) = more.parent_id.strip_prefix("t1_") {
                            self.threads.push(parent.to_string());
                        }
                    } else {
                        self.pending.extend(more.children);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Resolve collapsed branches until none remain.
///
/// `more_children` fetches up to [`MAX_PAGE_SIZE`] comment ids at once;
/// `thread` fetches the subtree rooted at one comment, that comment included.
fn expand<M, T>(walk: &mut CommentWalk, mut more_children: M, mut thread: T) -> Result<()>
where
    M: FnMut(&[String]) -> Result<Vec<Thing>>,
    T: FnMut(&str) -> Result<Vec<Thing>>,
{
    let mut requested: HashSet<String> = HashSet::new();
    let mut continued: HashSet<String> = HashSet::new();

    while !(walk.pending.is_empty() && walk.threads.is_empty()) {
        let batch: Vec<String> = std::mem::take(&mut walk.pending)
            .into_iter()
            .filter(|id| requested.insert(id.clone()))
            .collect();
        for chunk in batch.chunks(MAX_PAGE_SIZE) {
            walk.visit(more_children(chunk)?)?;
        }

        let parents: Vec<String> = std::mem::take(&mut walk.threads)
            .into_iter()
            .filter(|id| continued.insert(id.clone()))
            .collect();
        for parent in parents {
            walk.visit(thread(&parent)?)?;
        }
    }
    Ok(())
}

/// Page through a listing until `limit` items are collected or it ends.
///
/// `fetch_page` receives the page size to request and the `after` cursor.
fn paginate<F>(page_size: usize, limit: Option<usize>, mut fetch_page: F) -> Result<Vec<Post>>
where
    F: FnMut(usize, Option<&str>) -> Result<(Vec<Post>, Option<String>)>,
{
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut posts = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let remaining = limit.map(|l| l.saturating_sub(posts.len()));
        if remaining == Some(0) {
            break;
        }
        let request = remaining.map_or(page_size, |r| r.min(page_size));

        let (page, next) = fetch_page(request, after.as_deref())?;
        let received = page.len();
        posts.extend(page);
        debug!(received, total = posts.len(), "Fetched page");

        match next {
            Some(cursor) if received > 0 => after = Some(cursor),
            _ => break,
        }
    }

    if let Some(limit) = limit {
        posts.truncate(limit);
    }
    Ok(posts)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the forum's OAuth API.
pub struct RedditClient {
    http: reqwest::blocking::Client,
    api_url: String,
    subreddit: String,
    page_size: usize,
    token: String,
}

impl RedditClient {
    /// Exchange the refresh token for an access token.
    ///
    /// # Errors
    ///
    /// Returns a fetch error if the token endpoint fails or returns no token.
    pub fn connect(credentials: &Credentials, config: &ForumConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let response = http
            .post(&config.auth_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(TendiesError::Api {
                status,
                url: config.auth_url.clone(),
            });
        }

        let token: TokenResponse = response.json()?;
        let token = match (token.access_token, token.error) {
            (Some(access), _) if !access.is_empty() => access,
            (_, Some(error)) => {
                return Err(TendiesError::api_response(format!("token grant refused: {error}")));
            }
            _ => return Err(TendiesError::api_response("token response had no access_token")),
        };
        info!(subreddit = %config.subreddit, "Authenticated with forum API");

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            subreddit: config.subreddit.clone(),
            page_size: config.page_size,
            token,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.api_url);
        debug!(%url, ?params, "GET");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TendiesError::Api {
                status,
                url: response.url().to_string(),
            });
        }
        Ok(response.json()?)
    }

    fn paged_posts(
        &self,
        path: &str,
        params: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        paginate(self.page_size, limit, |page, after| {
            let mut query = params.to_vec();
            query.push(("limit", page.to_string()));
            if let Some(after) = after {
                query.push(("after", after.to_string()));
            }
            let listing: Listing = self.get(path, &query)?;
            Ok((posts_from(listing.data.children)?, listing.data.after))
        })
    }

    fn more_children(&self, link_id: &str, ids: &[String]) -> Result<Vec<Thing>> {
        let response: MoreChildrenResponse = self.get(
            "/api/morechildren",
            &[
                ("api_type", "json".to_string()),
                ("link_id", link_id.to_string()),
                ("children", ids.join(",")),
                ("raw_json", "1".to_string()),
            ],
        )?;
        if let Some(error) = response.json.errors.first() {
            return Err(TendiesError::api_response(format!("morechildren: {error}")));
        }
        Ok(response.json.data.things)
    }

    /// The comment listing of `/comments/{id}`, the second of the two listings
    /// it returns.
    fn comment_tree(&self, path: &str, extra: &[(&str, String)]) -> Result<Vec<Thing>> {
        let mut params = vec![("raw_json", "1".to_string())];
        params.extend_from_slice(extra);
        let listings: Vec<Listing> = self.get(path, &params)?;
        listings
            .into_iter()
            .nth(1)
            .map(|tree| tree.data.children)
            .ok_or_else(|| TendiesError::api_response(format!("no comment listing at {path}")))
    }

    /// A "continue this thread" branch: the subtree rooted at `comment`.
    fn comment_thread(&self, path: &str, comment: &str) -> Result<Vec<Thing>> {
        self.comment_tree(path, &[("comment", comment.to_string())])
    }
}

impl ForumApi for RedditClient {
    fn search(
        &self,
        query: &str,
        sort: SortOrder,
        time_filter: TimeFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        let path = format!("/r/{}/search", self.subreddit);
        let posts = self.paged_posts(
            &path,
            &[
                ("q", query.to_string()),
                ("sort", sort.as_str().to_string()),
                ("t", time_filter.as_str().to_string()),
                ("restrict_sr", "1".to_string()),
                ("raw_json", "1".to_string()),
            ],
            limit,
        )?;
        info!(query, %sort, %time_filter, count = posts.len(), "Search complete");
        Ok(posts)
    }

    fn listing(
        &self,
        listing: SortOrder,
        time_filter: Option<TimeFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        let path = format!("/r/{}/{}", self.subreddit, listing.as_str());
        let mut params = vec![("raw_json", "1".to_string())];
        if let Some(time_filter) = time_filter.filter(|_| listing.takes_time_filter()) {
            params.push(("t", time_filter.as_str().to_string()));
        }
        let posts = self.paged_posts(&path, &params, limit)?;
        info!(%listing, count = posts.len(), "Listing complete");
        Ok(posts)
    }

    fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
        let path = format!("/comments/{}", post.id);
        let mut walk = CommentWalk::default();
        walk.visit(self.comment_tree(&path, &[])?)?;

        let link_id = if post.name.is_empty() {
            format!("t3_{}", post.id)
        } else {
            post.name.clone()
        };
        expand(
            &mut walk,
            |ids| self.more_children(&link_id, ids),
            |parent| self.comment_thread(&path, parent),
        )?;

        debug!(post = %post.id, count = walk.comments.len(), "Comments expanded");
        Ok(walk.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            ..Post::default()
        }
    }

    #[test]
    fn paginate_stops_at_limit() {
        let mut requests = Vec::new();
        let posts = paginate(2, Some(5), |size, after| {
            requests.push((size, after.map(str::to_string)));
            let page: Vec<Post> = (0..size).map(|i| post(&format!("p{i}"))).collect();
            Ok((page, Some("cursor".to_string())))
        })
        .unwrap();

        assert_eq!(posts.len(), 5);
        let sizes: Vec<usize> = requests.iter().map(|(s, _)| *s).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(requests[0].1.is_none());
        assert_eq!(requests[1].1.as_deref(), Some("cursor"));
    }

    #[test]
    fn paginate_unbounded_runs_until_cursor_ends() {
        let mut calls = 0;
        let posts = paginate(100, None, |_, _| {
            calls += 1;
            let next = (calls < 3).then(|| format!("c{calls}"));
            Ok((vec![post(&format!("p{calls}"))], next))
        })
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(posts.len(), 3);
    }

    #[test]
    fn paginate_stops_on_empty_page() {
        let posts = paginate(10, None, |_, _| Ok((vec![], Some("again".to_string())))).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn page_size_is_capped() {
        let mut seen = 0;
        paginate(500, Some(1000), |size, _| {
            seen = size;
            Ok((vec![], None))
        })
        .unwrap();
        assert_eq!(seen, MAX_PAGE_SIZE);
    }

    #[test]
    fn listing_keeps_only_submissions() {
        let listing: Listing = serde_json::from_value(json!({
            "kind": "Listing",
            "data": {
                "after": "t3_b2",
                "children": [
                    {"kind": "t3", "data": {"id": "a1", "title": "GME", "score": 5, "created_utc": 1611000000.0}},
                    {"kind": "t5", "data": {"display_name": "wallstreetbets"}},
                    {"kind": "t3", "data": {"id": "b2", "title": "AMC", "selftext": "hold"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(listing.data.after.as_deref(), Some("t3_b2"));
        let posts = posts_from(listing.data.children).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
        assert_eq!(posts[0].score, 5);
    }

    #[test]
    fn comment_walk_is_depth_first_and_collects_more() {
        let tree = json!([
            {"kind": "t1", "data": {
                "id": "c1", "body": "GME", "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"id": "c2", "body": "AMC", "replies": ""}},
                    {"kind": "more", "data": {"children": ["c5", "c6"], "count": 2}}
                ]}}
            }},
            {"kind": "t1", "data": {"id": "c3", "body": "BB", "replies": ""}},
            {"kind": "more", "data": {"children": ["c7"], "count": 1}}
        ]);
        let things: Vec<Thing> = serde_json::from_value(tree).unwrap();

        let mut walk = CommentWalk::default();
        walk.visit(things).unwrap();

        let ids: Vec<&str> = walk.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(walk.pending, vec!["c5", "c6", "c7"]);
    }

    #[test]
    fn continue_thread_link_queues_its_parent() {
        let tree = json!([
            {"kind": "t1", "data": {
                "id": "c1", "body": "GME", "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "more", "data": {"id": "_", "parent_id": "t1_c1", "children": [], "count": 0}}
                ]}}
            }}
        ]);
        let things: Vec<Thing> = serde_json::from_value(tree).unwrap();

        let mut walk = CommentWalk::default();
        walk.visit(things).unwrap();

        assert_eq!(walk.comments.len(), 1);
        assert!(walk.pending.is_empty());
        assert_eq!(walk.threads, vec!["c1"]);
    }

    fn things(value: serde_json::Value) -> Vec<Thing> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn expand_follows_more_ids_and_continued_threads() {
        let mut walk = CommentWalk::default();
        walk.visit(things(json!([
            {"kind": "t1", "data": {"id": "c1", "body": "GME", "replies": {"kind": "Listing", "data": {"children": [
                {"kind": "more", "data": {"id": "_", "parent_id": "t1_c1", "children": []}}
            ]}}}},
            {"kind": "more", "data": {"parent_id": "t3_p1", "children": ["c2"]}}
        ])))
        .unwrap();

        let mut batches = Vec::new();
        let mut threads = Vec::new();
        expand(
            &mut walk,
            |ids| {
                batches.push(ids.to_vec());
                Ok(things(json!([{"kind": "t1", "data": {"id": "c2", "body": "AMC"}}])))
            },
            |parent| {
                threads.push(parent.to_string());
                // The subtree repeats its root before the replies that were cut off.
                Ok(things(json!([
                    {"kind": "t1", "data": {"id": "c1", "body": "GME", "replies": {"kind": "Listing", "data": {"children": [
                        {"kind": "t1", "data": {"id": "c9", "body": "deep BB", "replies": ""}}
                    ]}}}}
                ])))
            },
        )
        .unwrap();

        assert_eq!(batches, vec![vec!["c2".to_string()]]);
        assert_eq!(threads, vec!["c1"]);
        let ids: Vec<&str> = walk.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c9"]);
    }

    #[test]
    fn expand_requests_each_branch_once() {
        let mut walk = CommentWalk::default();
        walk.pending.push("c2".to_string());
        walk.threads.push("c1".to_string());

        let mut thread_calls = 0;
        expand(
            &mut walk,
            |_| Ok(things(json!([{"kind": "more", "data": {"children": ["c2"]}}]))),
            |_| {
                thread_calls += 1;
                Ok(things(json!([
                    {"kind": "more", "data": {"id": "_", "parent_id": "t1_c1", "children": []}}
                ])))
            },
        )
        .unwrap();

        assert_eq!(thread_calls, 1);
        assert!(walk.pending.is_empty() && walk.threads.is_empty());
    }

    #[test]
    fn more_children_response_parses() {
        let response: MoreChildrenResponse = serde_json::from_value(json!({
            "json": {"errors": [], "data": {"things": [
                {"kind": "t1", "data": {"id": "c5", "body": "TSLA", "parent_id": "t1_c1"}}
            ]}}
        }))
        .unwrap();
        assert!(response.json.errors.is_empty());
        assert_eq!(response.json.data.things.len(), 1);
    }

    #[test]
    fn credentials_require_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        std::fs::write(&path, r#"{"client_id": "id", "client_secret": "s", "user_agent": "ua"}"#)
            .unwrap();
        let err = Credentials::load(&path).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("refresh_token"));

        std::fs::write(
            &path,
            r#"{"client_id": "id", "client_secret": "s", "refresh_token": " ", "user_agent": "ua"}"#,
        )
        .unwrap();
        assert!(Credentials::load(&path).is_err());

        std::fs::write(
            &path,
            r#"{"client_id": "id", "client_secret": "s", "refresh_token": "r", "user_agent": "ua"}"#,
        )
        .unwrap();
        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.client_id, "id");
        assert!(!format!("{creds:?}").contains("\"s\""));
    }

    #[test]
    fn missing_credentials_file_is_configuration_error() {
        let err = Credentials::load(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(matches!(err, TendiesError::Credentials { .. }));
    }
}
