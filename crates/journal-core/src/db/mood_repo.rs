//! Mood repository: reads and seed inserts for the `moods` table.

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::mood::{Mood, MoodCategory};

const SELECT_COLUMNS: &str = "SELECT id, name, icon, category, created_at, updated_at FROM moods";

/// A raw mood row from the database.
#[derive(Debug, Clone)]
struct MoodRow {
    id: String,
    name: String,
    icon: Option<String>,
    category: String,
    created_at: String,
    updated_at: String,
}

impl MoodRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            icon: row.get("icon")?,
            category: row.get("category")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_mood(self) -> Result<Mood, DatabaseError> {
        let id = Uuid::parse_str(&self.id).map_err(|_| DatabaseError::InvalidValue {
            column: "id",
            value: self.id.clone(),
        })?;
        let category: MoodCategory =
            self.category
                .parse()
                .map_err(|_| DatabaseError::InvalidValue {
                    column: "category",
                    value: self.category.clone(),
                })?;
        Ok(Mood {
            id,
            name: self.name,
            icon: self.icon,
            category,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn collect(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<Mood>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(args, MoodRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(MoodRow::into_mood).collect()
}

fn first(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> Result<Option<Mood>, DatabaseError> {
    conn.query_row(sql, args, MoodRow::from_row)
        .optional()?
        .map(MoodRow::into_mood)
        .transpose()
}

/// Inserts a mood row.
pub fn insert(db: &Database, mood: &Mood) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO moods (id, name, icon, category, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mood.id.to_string(),
                mood.name,
                mood.icon,
                mood.category.as_str(),
                format_timestamp(mood.created_at),
                format_timestamp(mood.updated_at),
            ],
        )?;
        Ok(())
    })
}

/// All moods ordered by category, then name.
pub fn list_all(db: &Database) -> Result<Vec<Mood>, DatabaseError> {
    db.with_conn(|conn| {
        collect(
            conn,
            &format!("{} ORDER BY category, name", SELECT_COLUMNS),
            &[],
        )
    })
}

/// Moods of one category ordered by name.
pub fn list_by_category(
    db: &Database,
    category: MoodCategory,
) -> Result<Vec<Mood>, DatabaseError> {
    db.with_conn(|conn| {
        collect(
            conn,
            &format!("{} WHERE category = ?1 ORDER BY name", SELECT_COLUMNS),
            &[&category.as_str()],
        )
    })
}

/// Finds a mood by its ID.
pub fn find_by_id(db: &Database, id: Uuid) -> Result<Option<Mood>, DatabaseError> {
    db.with_conn(|conn| {
        first(
            conn,
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            &[&id.to_string()],
        )
    })
}

/// Case-insensitive exact name match.
pub fn find_by_name(db: &Database, name: &str) -> Result<Option<Mood>, DatabaseError> {
    db.with_conn(|conn| {
        first(
            conn,
            &format!("{} WHERE lower(name) = lower(?1)", SELECT_COLUMNS),
            &[&name],
        )
    })
}

/// Moods whose name contains `fragment`, case-insensitively, ordered by name.
pub fn search_by_name(db: &Database, fragment: &str) -> Result<Vec<Mood>, DatabaseError> {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{}%", escaped.to_lowercase());
    db.with_conn(|conn| {
        collect(
            conn,
            &format!(
                "{} WHERE lower(name) LIKE ?1 ESCAPE '\\' ORDER BY name",
                SELECT_COLUMNS
            ),
            &[&pattern],
        )
    })
}

/// Total number of moods.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM moods", [], |r| r.get(0))?;
        Ok(count)
    })
}
