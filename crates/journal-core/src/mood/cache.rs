//! Process-wide mood taxonomy cache.
//!
//! Holds snapshot lists of moods keyed by [`CacheKey`]. Every read and write
//! copies, so callers never hold a reference into the cached data. Entries
//! live until [`MoodCache::invalidate_all`] is called; there is no TTL and no
//! size bound because the key space is the closed category set plus `all`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use super::{Mood, MoodCategory};
use crate::error::MoodError;

/// Normalized cache key. Only constructible from the closed category set or
/// the `all` sentinel, so case variants of a category share one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    All,
    Category(MoodCategory),
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::All => "all",
            CacheKey::Category(category) => category.as_str(),
        }
    }
}

impl From<MoodCategory> for CacheKey {
    fn from(category: MoodCategory) -> Self {
        CacheKey::Category(category)
    }
}

impl From<Option<MoodCategory>> for CacheKey {
    fn from(category: Option<MoodCategory>) -> Self {
        category.map_or(CacheKey::All, CacheKey::Category)
    }
}

impl FromStr for CacheKey {
    type Err = MoodError;

    /// Accepts `all` or any category name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CacheKey::All);
        }
        s.parse::<MoodCategory>().map(CacheKey::Category)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe mood snapshot cache.
///
/// A single mutex orders all operations. Critical sections only clone
/// in-memory data, so the cache is safe to call from async handlers.
#[derive(Debug, Default)]
pub struct MoodCache {
    entries: Mutex<HashMap<CacheKey, Vec<Mood>>>,
}

impl MoodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached snapshot, or `None` on a miss.
    pub fn get(&self, key: CacheKey) -> Option<Vec<Mood>> {
        self.lock().get(&key).cloned()
    }

    /// Stores a copy of `moods` under `key`, replacing any previous snapshot.
    pub fn put(&self, key: CacheKey, moods: &[Mood]) {
        let snapshot = moods.to_vec();
        self.lock().insert(key, snapshot);
    }

    /// Drops every cached snapshot.
    pub fn invalidate_all(&self) {
        let mut entries = self.lock();
        if !entries.is_empty() {
            log::debug!("Invalidating {} mood cache entries", entries.len());
        }
        entries.clear();
    }

    /// Number of populated keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Vec<Mood>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Mood cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
