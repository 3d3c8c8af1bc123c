//! Ticker dictionary: the set of symbols extraction is allowed to report.
//!
//! Built from two exchange listings minus a blocklist of short common words
//! ("ALL", "FOR", "GO", ...) that are also valid symbols.

use crate::config::Config;
use crate::error::{Result, TendiesError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Noise words the collector has historically filtered.
///
/// Only the default; the active list comes from `[tickers] blocklist`.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "A", "AF", "ALL", "ALLY", "AM", "AN", "ANY", "AT", "ARE", "AWAY", "ACAT", "AG", "AGO", "AVG",
    "ADX", "AI", "AA", "ADHD", "ACT", "ACH", //
    "B", "BABY", "BIG", "BLUE", "BOOM", //
    "C", "CALL", "CEO", "CASH", "CUZ", "CAP", //
    "D", "DM", "DO", "DD", "DATA", "DE", //
    "E", "ELON", "EOD", "EV", "ELSE", "EXP", "EVER", "EAT", //
    "F", "FI", "FLY", "FOR", "FUEL", "FREE", "FULL", "FUND", "FCF", "FT", //
    "G", "GAIN", "GAME", "GF", "GMT", "GO", "GOOD", "GS", "GOLD", "GDP", //
    "H", "HAS", "HE", "HEAR", "HERO", "HF", "HOT", //
    "I", "IM", "ING", "IT", "ITT", "III", "IRS", "IBKR", "IP", "IRL", "ICE", //
    "JPM", //
    "K", //
    "L", "LINE", "LIVE", "LL", "LONG", "LOOK", "LOW", "LOAN", //
    "M", "MM", "MORE", "MY", "MAN", "MAC", "MSM", "MC", //
    "N", "NEWS", "NICE", "NOW", "NAME", //
    "O", "ONE", "OUT", "OMG", "OI", "OCC", //
    "P", "PM", "POST", "PSA", "PT", "PE", "PER", "PAY", "PPS", //
    "Q", //
    "R", "RH", "RE", "RBC", "RATE", "RNA", //
    "S", "SC", "SHIP", "SO", "STAY", "SEE", "SAVE", "SD", "SA", "SP", "SOL", "SAM", //
    "T", "TD", "TDA", "TIME", "TOO", "TV", "TA", "TWO", "TRUE", "TX", "TYPE", //
    "USA", //
    "V", //
    "W", "WIN", //
    "X", "XRS", //
    "Y", //
    "Z",
];

/// Symbols read from one exchange listing.
#[derive(Debug, Clone)]
pub struct ReferenceList {
    /// Where the symbols came from, for error messages.
    pub source: PathBuf,
    pub symbols: Vec<String>,
}

impl ReferenceList {
    pub fn new(source: impl Into<PathBuf>, symbols: Vec<String>) -> Self {
        Self {
            source: source.into(),
            symbols,
        }
    }

    /// Read the `column` of a comma-separated listing file.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::MissingReferenceData`] if the file does not
    /// exist, a configuration error if the column is absent, or a CSV error.
    pub fn read_csv(path: &Path, column: &str) -> Result<Self> {
        if !path.exists() {
            return Err(TendiesError::MissingReferenceData {
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let index = reader
            .headers()?
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| {
                TendiesError::configuration(format!(
                    "column '{column}' not found in {}",
                    path.display()
                ))
            })?;

        let mut symbols = Vec::new();
        for row in reader.records() {
            let row = row?;
            if let Some(symbol) = row.get(index) {
                let symbol = symbol.trim().to_uppercase();
                if !symbol.is_empty() {
                    symbols.push(symbol);
                }
            }
        }

        debug!(path = %path.display(), count = symbols.len(), "Read ticker reference list");
        Ok(Self::new(path, symbols))
    }
}

/// Candidate tickers plus the blocklist used to build them.
#[derive(Debug, Clone)]
pub struct TickerDictionary {
    candidates: HashSet<String>,
    blocklist: HashSet<String>,
}

impl TickerDictionary {
    /// Union both listings and remove every blocklisted word.
    ///
    /// # Errors
    ///
    /// Returns [`TendiesError::EmptyReferenceData`] if either listing has no
    /// symbols; extraction would otherwise silently match nothing.
    pub fn build(
        nyse: &ReferenceList,
        nasdaq: &ReferenceList,
        blocklist: &[String],
    ) -> Result<Self> {
        for list in [nyse, nasdaq] {
            if list.symbols.iter().all(|s| s.trim().is_empty()) {
                return Err(TendiesError::EmptyReferenceData {
                    path: list.source.clone(),
                });
            }
        }

        let blocklist: HashSet<String> = blocklist
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let candidates: HashSet<String> = nyse
            .symbols
            .iter()
            .chain(&nasdaq.symbols)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && !blocklist.contains(s))
            .collect();

        Ok(Self {
            candidates,
            blocklist,
        })
    }

    /// Load both listings named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a listing is missing or empty.
    pub fn load(config: &Config) -> Result<Self> {
        let nyse = ReferenceList::read_csv(&config.paths.nyse_tickers, &config.tickers.nyse_column)?;
        let nasdaq = ReferenceList::read_csv(
            &config.paths.nasdaq_tickers,
            &config.tickers.nasdaq_column,
        )?;
        let dictionary = Self::build(&nyse, &nasdaq, &config.tickers.blocklist)?;
        info!(
            candidates = dictionary.len(),
            blocked = dictionary.blocklist.len(),
            "Ticker dictionary ready"
        );
        Ok(dictionary)
    }

    /// Whether `token` is a candidate ticker.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.candidates.contains(token)
    }

    /// Whether `token` is a blocklisted noise word.
    #[must_use]
    pub fn is_blocked(&self, token: &str) -> bool {
        self.blocklist.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
