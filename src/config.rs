//! Configuration system for tendies.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **Config file** - `~/.config/tendies/config.toml` or `--config <path>`
//! 3. **Environment variables** - `TENDIES_*` prefix
//! 4. **CLI arguments** - Highest priority, applied by the binary
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! output = "./output"
//! credentials = "./credentials.json"
//!
//! [forum]
//! subreddit = "wallstreetbets"
//!
//! [tickers]
//! blocklist = ["ALL", "FOR", "GO", "YOLO"]
//!
//! [chart]
//! theme = "dark"
//!
//! [chart.min_mentions]
//! DailyDiscussion = 11
//! ```

use crate::error::{Result, ResultExt, TendiesError};
use crate::model::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for tendies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub forum: ForumConfig,
    pub tickers: TickersConfig,
    pub chart: ChartConfig,
}

/// File locations for inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the curated, raw and semantic folders.
    /// Environment variable: `TENDIES_OUTPUT`
    pub output: PathBuf,

    /// OAuth credentials JSON.
    /// Environment variable: `TENDIES_CREDENTIALS`
    pub credentials: PathBuf,

    /// NYSE listed symbols CSV (`ACT Symbol` column).
    pub nyse_tickers: PathBuf,

    /// NASDAQ listed symbols CSV (`Symbol` column).
    pub nasdaq_tickers: PathBuf,

    /// Custom HTML template; the built-in template is used when unset.
    pub template: Option<PathBuf>,

    /// Rendered page location; defaults to `<output>/index.html`.
    pub html: Option<PathBuf>,
}

/// Forum API endpoints and paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumConfig {
    /// Environment variable: `TENDIES_SUBREDDIT`
    pub subreddit: String,
    pub auth_url: String,
    pub api_url: String,
    /// Items requested per page (the API caps this at 100).
    pub page_size: usize,
    pub timeout_secs: u64,
}

/// Ticker dictionary inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickersConfig {
    /// Column holding symbols in the NYSE list.
    pub nyse_column: String,
    /// Column holding symbols in the NASDAQ list.
    pub nasdaq_column: String,
    /// Short common words that collide with real symbols.
    pub blocklist: Vec<String>,
}

/// Chart appearance and filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// vega-embed theme name.
    pub theme: String,
    /// Link target for table entries.
    pub link_target: String,
    pub width: u32,
    pub height: u32,
    /// Rows shown in the ranked detail table.
    pub table_rows: usize,
    /// Tickers need strictly more mentions than this to be charted,
    /// keyed by category name.
    pub min_mentions: BTreeMap<String, usize>,
    pub vega_version: String,
    pub vega_lite_version: String,
    pub vega_embed_version: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
            credentials: PathBuf::from("credentials.json"),
            nyse_tickers: PathBuf::from("nyse-listed.csv"),
            nasdaq_tickers: PathBuf::from("nasdaq-listed.csv"),
            template: None,
            html: None,
        }
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            subreddit: "wallstreetbets".to_string(),
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

impl Default for TickersConfig {
    fn default() -> Self {
        Self {
            nyse_column: "ACT Symbol".to_string(),
            nasdaq_column: "Symbol".to_string(),
            blocklist: crate::tickers::DEFAULT_BLOCKLIST
                .iter()
                .map(|w| (*w).to_string())
                .collect(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            link_target: "_blank".to_string(),
            width: 1400,
            height: 400,
            table_rows: 20,
            min_mentions: Category::all()
                .into_iter()
                .map(|c| (c.name().to_string(), default_min_mentions(c)))
                .collect(),
            vega_version: "5".to_string(),
            vega_lite_version: "5".to_string(),
            vega_embed_version: "6.15.1".to_string(),
        }
    }
}

/// Mention threshold used when the config does not name the category.
#[must_use]
pub const fn default_min_mentions(category: Category) -> usize {
    match category {
        Category::DailyDiscussion => 11,
        Category::DueDiligence | Category::StockTicker => 1,
    }
}

impl ChartConfig {
    /// Mention threshold for a category.
    #[must_use]
    pub fn min_mentions_for(&self, category: Category) -> usize {
        self.min_mentions
            .get(category.name())
            .copied()
            .unwrap_or_else(|| default_min_mentions(category))
    }
}

impl Config {
    /// Load configuration from defaults, a config file and the environment.
    ///
    /// An explicit `path` must exist and parse; the user config file is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::ConfigFile`] if a config file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::user_config_path() {
                Some(user) if user.exists() => Self::load_from_file(&user)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides();
        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::ConfigFile`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TendiesError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| TendiesError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tendies").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(output) = std::env::var("TENDIES_OUTPUT") {
            self.paths.output = PathBuf::from(output);
        }
        if let Ok(credentials) = std::env::var("TENDIES_CREDENTIALS") {
            self.paths.credentials = PathBuf::from(credentials);
        }
        if let Ok(subreddit) = std::env::var("TENDIES_SUBREDDIT") {
            self.forum.subreddit = subreddit;
        }
    }

    /// Whether colored output is wanted.
    #[must_use]
    pub fn colors_enabled() -> bool {
        std::env::var("TENDIES_NO_COLOR").is_err() && std::env::var("NO_COLOR").is_err()
    }

    /// Folder holding one curated table per category.
    #[must_use]
    pub fn curated_dir(&self) -> PathBuf {
        self.paths.output.join("curated")
    }

    /// Folder holding timestamped raw audit tables.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.paths.output.join("raw")
    }

    /// Folder holding one chart spec per category.
    #[must_use]
    pub fn semantic_dir(&self) -> PathBuf {
        self.paths.output.join("semantic")
    }

    /// Rendered HTML page path.
    #[must_use]
    pub fn html_path(&self) -> PathBuf {
        self.paths
            .html
            .clone()
            .unwrap_or_else(|| self.paths.output.join("index.html"))
    }

    /// Write this configuration to `path`, creating parent folders.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path("create", parent)?;
        }
        std::fs::write(path, self.to_toml()).with_path("write", path)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Render as pretty TOML.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.forum.subreddit, "wallstreetbets");
        assert_eq!(config.forum.page_size, 100);
        assert_eq!(config.chart.table_rows, 20);
        assert!(config.tickers.blocklist.iter().any(|w| w == "ALL"));
        assert_eq!(config.html_path(), PathBuf::from("output/index.html"));
    }

    #[test]
    fn test_min_mentions_defaults() {
        let chart = ChartConfig::default();
        assert_eq!(chart.min_mentions_for(Category::StockTicker), 1);
        assert_eq!(chart.min_mentions_for(Category::DailyDiscussion), 11);

        let empty = ChartConfig {
            min_mentions: BTreeMap::new(),
            ..ChartConfig::default()
        };
        assert_eq!(empty.min_mentions_for(Category::DueDiligence), 1);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.chart.min_mentions, config.chart.min_mentions);
        assert_eq!(parsed.tickers.blocklist, config.tickers.blocklist);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[forum]\nsubreddit = \"stocks\"\n\n[chart.min_mentions]\nStockTicker = 5\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.forum.subreddit, "stocks");
        assert_eq!(config.forum.page_size, 100);
        assert_eq!(config.chart.min_mentions_for(Category::StockTicker), 5);
        assert_eq!(config.chart.min_mentions_for(Category::DailyDiscussion), 11);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[forum\nsubreddit = ").unwrap();
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, TendiesError::ConfigFile { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_config_content() {
        let content = Config::default().to_toml();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[forum]"));
        assert!(content.contains("[tickers]"));
        assert!(content.contains("[chart]"));
    }
}
