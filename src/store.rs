//! Curated dataset storage and the incremental merge.
//!
//! Each category owns one `|`-delimited table under `<output>/curated/`.
//! Every fetch produces a batch that is merged into the existing table:
//! rows are keyed by identifier and the row with the latest `last_updated`
//! wins, ties broken by higher score. Rows are kept or dropped whole.

use crate::error::{Result, ResultExt, TendiesError};
use crate::model::{Category, CuratedRecord};
use crate::tickers::TickerDictionary;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Field delimiter of every table this crate writes.
pub const DELIMITER: u8 = b'|';

/// Open a delimited table for writing, creating parent folders.
pub(crate) fn table_writer(path: &Path) -> Result<csv::Writer<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_path("create", parent)?;
    }
    let file = File::create(path).with_path("create", path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_writer(file))
}

/// Write rows to a delimited table.
pub(crate) fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = table_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().with_path("flush", path)?;
    Ok(())
}

/// One category's curated table.
#[derive(Debug, Clone)]
pub struct CuratedStore {
    path: PathBuf,
}

impl CuratedStore {
    /// Store for `category` under `curated_dir`.
    #[must_use]
    pub fn new(curated_dir: &Path, category: Category) -> Self {
        Self {
            path: curated_dir.join(format!("{}.csv", category.name())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted table.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::PersistenceRead`] if the file is missing or
    /// any row fails to parse.
    pub fn read(&self) -> Result<Vec<CuratedRecord>> {
        let unreadable = |reason: String| TendiesError::persistence_read(&self.path, reason);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| unreadable(e.to_string()))?;

        let mut rows = Vec::new();
        for row in reader.deserialize::<CuratedRecord>() {
            rows.push(row.map_err(|e| unreadable(e.to_string()))?);
        }
        debug!(path = %self.path.display(), rows = rows.len(), "Read curated dataset");
        Ok(rows)
    }

    /// Read the persisted table, treating any failure as "no dataset yet".
    ///
    /// A file that exists but cannot be parsed is renamed aside so the next
    /// write does not destroy it.
    #[must_use]
    pub fn load_existing(&self) -> Option<Vec<CuratedRecord>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No curated dataset yet, starting fresh");
            return None;
        }

        match self.read() {
            Ok(rows) => Some(rows),
            Err(err) => {
                warn!(error = %err, "Curated dataset unreadable, starting fresh");
                self.set_aside();
                None
            }
        }
    }

    fn set_aside(&self) {
        let mut aside = self.path.clone().into_os_string();
        aside.push(format!(".unreadable-{}", Utc::now().format("%Y%m%d%H%M%S")));
        let aside = PathBuf::from(aside);
        match std::fs::rename(&self.path, &aside) {
            Ok(()) => warn!(to = %aside.display(), "Moved unreadable curated dataset aside"),
            Err(e) => warn!(error = %e, "Could not move unreadable curated dataset aside"),
        }
    }

    /// Replace the persisted table with `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    pub fn write(&self, rows: &[CuratedRecord]) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        write_table(&tmp, rows)?;
        std::fs::rename(&tmp, &self.path).with_path("replace", &self.path)?;
        info!(path = %self.path.display(), rows = rows.len(), "Saved curated dataset");
        Ok(())
    }

    /// Merge a new batch into the persisted table, clean it and save it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the merged table cannot be written.
    pub fn merge_batch(
        &self,
        batch: Vec<CuratedRecord>,
        dictionary: &TickerDictionary,
    ) -> Result<Vec<CuratedRecord>> {
        let existing = self.load_existing();
        let merged = clean(merge(existing, batch), dictionary);
        self.write(&merged)?;
        Ok(merged)
    }

    /// Re-read, clean and overwrite the persisted table.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::PersistenceRead`] if there is nothing to clean.
    pub fn clean_in_place(&self, dictionary: &TickerDictionary) -> Result<usize> {
        let rows = clean(self.read()?, dictionary);
        self.write(&rows)?;
        Ok(rows.len())
    }
}

/// Union `existing` and `batch`, keeping one row per identifier.
///
/// The surviving row has the greatest `(last_updated, score)`; on a full tie
/// the later row (the batch) wins. Output is ordered by identifier.
#[must_use]
pub fn merge(existing: Option<Vec<CuratedRecord>>, batch: Vec<CuratedRecord>) -> Vec<CuratedRecord> {
    let mut by_id: HashMap<String, CuratedRecord> = HashMap::new();

    for record in existing.into_iter().flatten().chain(batch) {
        match by_id.entry(record.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if supersedes(&record, slot.get()) {
                    slot.insert(record);
                }
            }
        }
    }

    let mut merged: Vec<CuratedRecord> = by_id.into_values().collect();
    merged.sort_by(|a, b| a.id.cmp(&b.id));
    merged
}

fn supersedes(candidate: &CuratedRecord, current: &CuratedRecord) -> bool {
    (candidate.last_updated, candidate.score) >= (current.last_updated, current.score)
}

/// Strip round-trip artifacts from ticker lists and drop blocklisted tokens.
///
/// Idempotent.
#[must_use]
pub fn clean(mut rows: Vec<CuratedRecord>, dictionary: &TickerDictionary) -> Vec<CuratedRecord> {
    for row in &mut rows {
        row.title_tickers = clean_tickers(&row.title_tickers, dictionary);
        row.body_tickers = clean_tickers(&row.body_tickers, dictionary);
    }
    rows
}

fn clean_tickers(tickers: &[String], dictionary: &TickerDictionary) -> Vec<String> {
    tickers
        .iter()
        .map(|t| t.replace(['\'', '"'], "").trim().to_string())
        .filter(|t| !t.is_empty() && !dictionary.is_blocked(t))
        .collect()
}

/// Text form of list-valued ticker columns: `['GME', 'AMC']`.
///
/// Items are single-quoted with `\` escaping `\` and `'`, so any list of
/// strings survives a round trip. The decoder also accepts double-quoted and
/// bare items as written by older collectors.
pub mod ticker_list {
    use serde::{Deserialize, Deserializer, Serializer};

    #[must_use]
    pub fn encode(items: &[String]) -> String {
        let quoted: Vec<String> = items
            .iter()
            .map(|item| format!("'{}'", item.replace('\\', "\\\\").replace('\'', "\\'")))
            .collect();
        format!("[{}]", quoted.join(", "))
    }

    #[must_use]
    pub fn decode(text: &str) -> Vec<String> {
        let text = text.trim();
        let inner = text.strip_prefix('[').unwrap_or(text);
        let inner = inner.strip_suffix(']').unwrap_or(inner);

        let mut items = Vec::new();
        let mut chars = inner.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c == ',' || c.is_whitespace() {
                chars.next();
                continue;
            }

            if c == '\'' || c == '"' {
                chars.next();
                let mut item = String::new();
                while let Some(ch) = chars.next() {
                    match ch {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                item.push(escaped);
                            }
                        }
                        ch if ch == c => break,
                        ch => item.push(ch),
                    }
                }
                items.push(item);
            } else {
                let mut item = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == ',' {
                        break;
                    }
                    item.push(ch);
                    chars.next();
                }
                let item = item.trim();
                if !item.is_empty() {
                    items.push(item.to_string());
                }
            }
        }
        items
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(items: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(items))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(decode(&text))
    }
}

/// Timestamps written as RFC 3339, read leniently.
///
/// Unparseable values read as `None` so the row survives.
pub mod lenient_datetime {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    #[must_use]
    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(parse(&text))
    }
}
