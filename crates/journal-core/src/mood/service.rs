//! Mood lookups backed by the shared [`MoodCache`].

use std::sync::Arc;

use uuid::Uuid;

use super::cache::{CacheKey, MoodCache};
use super::{seed, Mood, MoodCategory};
use crate::db::{mood_repo, Database, DatabaseError};
use crate::error::MoodError;

/// Common alternative names, resolved to the canonical mood name.
const MOOD_ALIASES: &[(&str, &[&str])] = &[
    ("happy", &["joy", "cheerful", "glad", "pleased"]),
    ("sad", &["unhappy", "down", "blue", "melancholy"]),
    ("angry", &["mad", "furious", "irritated", "annoyed"]),
    ("excited", &["thrilled", "pumped", "enthusiastic"]),
    ("calm", &["peaceful", "serene", "relaxed", "tranquil"]),
    ("stressed", &["anxious", "worried", "overwhelmed"]),
    ("grateful", &["thankful", "appreciative"]),
    ("focused", &["concentrated", "attentive", "mindful"]),
    ("tired", &["exhausted", "sleepy", "drained"]),
    ("lonely", &["isolated", "alone", "disconnected"]),
];

/// Trims, lowercases and resolves aliases.
pub fn normalize_mood_name(name: &str) -> Result<String, MoodError> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(MoodError::EmptyName);
    }

    let canonical = MOOD_ALIASES
        .iter()
        .find(|(mood, aliases)| *mood == normalized || aliases.contains(&normalized.as_str()))
        .map(|(mood, _)| (*mood).to_string());

    Ok(canonical.unwrap_or(normalized))
}

/// Mood queries for request handlers.
///
/// Cheap to clone; clones share the database handle and the cache.
#[derive(Clone)]
pub struct MoodService {
    db: Database,
    cache: Arc<MoodCache>,
}

impl MoodService {
    pub fn new(db: Database, cache: Arc<MoodCache>) -> Self {
        Self { db, cache }
    }

    /// All moods ordered by category, then name.
    pub fn get_all_moods(&self) -> Result<Vec<Mood>, MoodError> {
        self.load_through(CacheKey::All, || mood_repo::list_all(&self.db))
    }

    /// Moods of one category ordered by name. The category is matched
    /// case-insensitively.
    pub fn get_moods_by_category(&self, category: &str) -> Result<Vec<Mood>, MoodError> {
        let category: MoodCategory = category.parse()?;
        self.load_through(CacheKey::Category(category), || {
            mood_repo::list_by_category(&self.db, category)
        })
    }

    pub fn get_mood_by_id(&self, id: Uuid) -> Result<Option<Mood>, MoodError> {
        Ok(mood_repo::find_by_id(&self.db, id)?)
    }

    /// Looks a mood up by name or alias. Falls back to the first mood whose
    /// name contains the normalized input.
    pub fn find_mood_by_name(&self, name: &str) -> Result<Option<Mood>, MoodError> {
        let normalized = normalize_mood_name(name)?;

        if let Some(mood) = mood_repo::find_by_name(&self.db, &normalized)? {
            return Ok(Some(mood));
        }

        Ok(mood_repo::search_by_name(&self.db, &normalized)?
            .into_iter()
            .next())
    }

    /// Inserts missing default moods and drops cached snapshots.
    pub fn reseed(&self) -> Result<usize, MoodError> {
        let inserted = seed::seed_default_moods(&self.db)?;
        self.cache.invalidate_all();
        Ok(inserted)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    pub fn cache(&self) -> &Arc<MoodCache> {
        &self.cache
    }

    fn load_through<F>(&self, key: CacheKey, load: F) -> Result<Vec<Mood>, MoodError>
    where
        F: FnOnce() -> Result<Vec<Mood>, DatabaseError>,
    {
        if let Some(cached) = self.cache.get(key) {
            log::trace!("Mood cache hit for '{}'", key);
            return Ok(cached);
        }

        log::debug!("Mood cache miss for '{}', loading from database", key);
        let moods = load()?;
        self.cache.put(key, &moods);
        Ok(moods)
    }
}
