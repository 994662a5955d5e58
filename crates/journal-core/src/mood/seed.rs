//! Default system moods.

use super::{Mood, MoodCategory};
use crate::db::{mood_repo, Database, DatabaseError};
use crate::error::MoodError;

/// (name, icon, category) for every built-in mood.
pub const DEFAULT_MOODS: &[(&str, &str, MoodCategory)] = &[
    ("happy", "😊", MoodCategory::Positive),
    ("excited", "🤩", MoodCategory::Positive),
    ("calm", "😌", MoodCategory::Positive),
    ("grateful", "🙏", MoodCategory::Positive),
    ("content", "🙂", MoodCategory::Positive),
    ("sad", "😢", MoodCategory::Negative),
    ("angry", "😠", MoodCategory::Negative),
    ("stressed", "😰", MoodCategory::Negative),
    ("lonely", "😔", MoodCategory::Negative),
    ("focused", "🎯", MoodCategory::Neutral),
    ("tired", "😴", MoodCategory::Neutral),
    ("bored", "😐", MoodCategory::Neutral),
];

/// Inserts any default mood that is not present yet (matched by name).
/// Returns the number of moods inserted.
pub fn seed_default_moods(db: &Database) -> Result<usize, MoodError> {
    let mut inserted = 0;
    for (name, icon, category) in DEFAULT_MOODS {
        if mood_repo::find_by_name(db, name)?.is_some() {
            continue;
        }
        let mood = Mood::new(name, Some(*icon), *category)?;
        insert_ignoring_race(db, &mood)?;
        inserted += 1;
    }

    if inserted > 0 {
        log::info!("Seeded {} default moods", inserted);
    }
    Ok(inserted)
}

fn insert_ignoring_race(db: &Database, mood: &Mood) -> Result<(), DatabaseError> {
    match mood_repo::insert(db, mood) {
        Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            log::debug!("Mood '{}' was seeded concurrently", mood.name);
            Ok(())
        }
        other => other,
    }
}
