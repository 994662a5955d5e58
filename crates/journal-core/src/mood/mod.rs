//! Mood taxonomy: reference records, the in-process cache and the service
//! that composes them.

pub mod cache;
pub mod seed;
pub mod service;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MoodError;

pub use cache::{CacheKey, MoodCache};
pub use seed::seed_default_moods;
pub use service::MoodService;

/// Closed set of mood categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Negative,
    Neutral,
    Positive,
}

impl MoodCategory {
    pub const ALL: [MoodCategory; 3] = [
        MoodCategory::Negative,
        MoodCategory::Neutral,
        MoodCategory::Positive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Positive => "positive",
            MoodCategory::Negative => "negative",
            MoodCategory::Neutral => "neutral",
        }
    }
}

impl fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodCategory {
    type Err = MoodError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(MoodCategory::Positive),
            "negative" => Ok(MoodCategory::Negative),
            "neutral" => Ok(MoodCategory::Neutral),
            _ => Err(MoodError::InvalidCategory(s.to_string())),
        }
    }
}

/// A system mood definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mood {
    pub id: Uuid,
    /// Lowercase display name, unique across moods.
    pub name: String,
    pub icon: Option<String>,
    pub category: MoodCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mood {
    /// Creates a new mood with a fresh id. The name is trimmed and lowercased.
    pub fn new(
        name: &str,
        icon: Option<&str>,
        category: MoodCategory,
    ) -> Result<Self, MoodError> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(MoodError::EmptyName);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            icon: icon.map(str::to_string),
            category,
            created_at: now,
            updated_at: now,
        })
    }
}
