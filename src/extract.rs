//! Ticker extraction from free text.
//!
//! A token is 1-5 uppercase ASCII letters, optionally prefixed with `$`,
//! followed by whitespace, one of `. ? ! ,`, or the end of the text. Nothing
//! is required before it: an uppercase run longer than five letters yields
//! its last five, and `100GME` yields `GME`. Tokens are kept only if they are in the
//! [`TickerDictionary`]. Matching is case-sensitive: lowercase text never
//! produces a ticker.

use crate::model::{ExtractedRecord, RawRecord, TextColumn};
use crate::tickers::TickerDictionary;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximal runs of uppercase letters with any leading dollar signs.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$*[A-Z]+").expect("ticker token pattern is valid"));

const MAX_TICKER_LEN: usize = 5;

/// Applies the token pattern and the dictionary filter.
pub struct TickerExtractor<'a> {
    dictionary: &'a TickerDictionary,
}

impl<'a> TickerExtractor<'a> {
    #[must_use]
    pub const fn new(dictionary: &'a TickerDictionary) -> Self {
        Self { dictionary }
    }

    /// Candidate tickers in order of appearance. Repeats are kept.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<String> {
        candidate_tokens(text)
            .filter(|token| self.dictionary.contains(token))
            .map(str::to_string)
            .collect()
    }

    /// Attach ticker lists for the given columns; other columns stay empty.
    #[must_use]
    pub fn extract_record(&self, raw: RawRecord, columns: &[TextColumn]) -> ExtractedRecord {
        let scan = |column: TextColumn| {
            if columns.contains(&column) {
                self.extract(raw.text(column))
            } else {
                Vec::new()
            }
        };
        let title_tickers = scan(TextColumn::Title);
        let body_tickers = scan(TextColumn::Body);

        ExtractedRecord {
            raw,
            title_tickers,
            body_tickers,
        }
    }

    /// Extract a whole batch.
    #[must_use]
    pub fn extract_all(&self, rows: Vec<RawRecord>, columns: &[TextColumn]) -> Vec<ExtractedRecord> {
        rows.into_iter()
            .map(|raw| self.extract_record(raw, columns))
            .collect()
    }
}

/// Ticker-shaped tokens of `text`, with the leading `$` stripped.
fn candidate_tokens(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_RE.find_iter(text).filter_map(move |m| {
        let followed_ok = text[m.end()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, '.' | '?' | '!' | ','));

        // ASCII letters only, so byte offsets are char offsets.
        let letters = m.as_str().trim_start_matches('$');
        followed_ok.then(|| &letters[letters.len().saturating_sub(MAX_TICKER_LEN)..])
    })
}
