//! Round-robin pool of Alpha Vantage API keys.

use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::errors::MarketDataError;

/// Prefix of numbered key variables (`ALPHAVANTAGE_API_KEY_1`, ...).
pub const NUMBERED_KEY_PREFIX: &str = "ALPHAVANTAGE_API_KEY_";

/// Numbered entries whose suffix is not a number sort after every numbered one.
const NON_NUMERIC_SUFFIX_RANK: u64 = 1_000_000_000;

/// Ordered, de-duplicated set of API keys with a shared cursor.
///
/// The cursor is only touched under the mutex, so concurrent callers each
/// receive a distinct key and a full cycle visits every key once.
pub struct KeyPool {
    keys: Vec<String>,
    cursor: Mutex<usize>,
}

impl KeyPool {
    /// Build a pool from keys in priority order. Blank keys are ignored and
    /// duplicates keep their first position.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref().trim();
            if key.is_empty() || unique.iter().any(|k| k == key) {
                continue;
            }
            unique.push(key.to_string());
        }
        Self {
            keys: unique,
            cursor: Mutex::new(0),
        }
    }

    /// Merge the three key sources in precedence order: the comma separated
    /// list, then the single key, then numbered variables sorted by suffix.
    ///
    /// `numbered` holds `(variable name, value)` pairs as read from the
    /// environment; names without [`NUMBERED_KEY_PREFIX`] are skipped.
    pub fn from_sources(
        list: Option<&str>,
        single: Option<&str>,
        numbered: Vec<(String, String)>,
    ) -> Self {
        let mut numbered: Vec<(u64, String, String)> = numbered
            .into_iter()
            .filter_map(|(name, value)| {
                let suffix = name.strip_prefix(NUMBERED_KEY_PREFIX)?.to_string();
                let rank = suffix.parse::<u64>().unwrap_or(NON_NUMERIC_SUFFIX_RANK);
                Some((rank, suffix, value))
            })
            .collect();
        numbered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let from_list = list.into_iter().flat_map(|l| l.split(','));
        let from_single = single.into_iter();
        let from_numbered = numbered.iter().map(|(_, _, value)| value.as_str());

        Self::new(from_list.chain(from_single).chain(from_numbered))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// The keys in rotation order.
    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn lock_cursor(&self) -> MutexGuard<'_, usize> {
        self.cursor.lock().unwrap_or_else(|poisoned| {
            warn!("Key pool cursor mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Next key in round-robin order.
    pub fn next(&self) -> Result<String, MarketDataError> {
        if self.keys.is_empty() {
            return Err(MarketDataError::NoCredentials);
        }
        let mut cursor = self.lock_cursor();
        let key = self.keys[*cursor % self.keys.len()].clone();
        *cursor = (*cursor + 1) % self.keys.len();
        Ok(key)
    }
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPool")
            .field("keys", &format_args!("[{} masked]", self.keys.len()))
            .finish()
    }
}
