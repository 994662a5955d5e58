//! Media repository: status transitions for the `entry_media` table.
//!
//! Functions take a plain `&Connection` so they work both on the shared
//! connection and inside a [`super::UnitOfWork`] transaction.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::media::{MediaRecord, MediaType, UploadStatus};

/// Derived fields written when processing succeeds.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub thumbnail_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_metadata: Option<serde_json::Value>,
}

/// A raw media row from the database.
#[derive(Debug, Clone)]
struct MediaRow {
    id: String,
    entry_id: Option<String>,
    user_id: String,
    media_type: String,
    file_path: String,
    original_filename: String,
    file_size: i64,
    mime_type: String,
    thumbnail_path: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    alt_text: Option<String>,
    upload_status: String,
    file_metadata: Option<String>,
    processing_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl MediaRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            entry_id: row.get("entry_id")?,
            user_id: row.get("user_id")?,
            media_type: row.get("media_type")?,
            file_path: row.get("file_path")?,
            original_filename: row.get("original_filename")?,
            file_size: row.get("file_size")?,
            mime_type: row.get("mime_type")?,
            thumbnail_path: row.get("thumbnail_path")?,
            width: row.get("width")?,
            height: row.get("height")?,
            alt_text: row.get("alt_text")?,
            upload_status: row.get("upload_status")?,
            file_metadata: row.get("file_metadata")?,
            processing_error: row.get("processing_error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<MediaRecord, DatabaseError> {
        let file_metadata = self
            .file_metadata
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|_| DatabaseError::InvalidValue {
                    column: "file_metadata",
                    value: raw,
                })
            })
            .transpose()?;

        Ok(MediaRecord {
            id: parse_uuid("id", &self.id)?,
            entry_id: self
                .entry_id
                .as_deref()
                .map(|v| parse_uuid("entry_id", v))
                .transpose()?,
            user_id: parse_uuid("user_id", &self.user_id)?,
            media_type: self
                .media_type
                .parse::<MediaType>()
                .map_err(|value| DatabaseError::InvalidValue {
                    column: "media_type",
                    value,
                })?,
            file_path: PathBuf::from(self.file_path),
            original_filename: self.original_filename,
            file_size: u64::try_from(self.file_size).map_err(|_| {
                DatabaseError::InvalidValue {
                    column: "file_size",
                    value: self.file_size.to_string(),
                }
            })?,
            mime_type: self.mime_type,
            thumbnail_path: self.thumbnail_path.map(PathBuf::from),
            width: self.width,
            height: self.height,
            alt_text: self.alt_text,
            upload_status: self
                .upload_status
                .parse::<UploadStatus>()
                .map_err(|value| DatabaseError::InvalidValue {
                    column: "upload_status",
                    value,
                })?,
            file_metadata,
            processing_error: self.processing_error,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn path_to_sql(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Inserts a new media row.
pub fn insert(conn: &Connection, record: &MediaRecord) -> Result<(), DatabaseError> {
    let file_size = i64::try_from(record.file_size).map_err(|_| DatabaseError::InvalidValue {
        column: "file_size",
        value: record.file_size.to_string(),
    })?;
    let file_metadata = record.file_metadata.as_ref().map(|v| v.to_string());

    conn.execute(
        "INSERT INTO entry_media (id, entry_id, user_id, media_type, file_path,
         original_filename, file_size, mime_type, thumbnail_path, width, height, alt_text,
         upload_status, file_metadata, processing_error, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            record.id.to_string(),
            record.entry_id.map(|id| id.to_string()),
            record.user_id.to_string(),
            record.media_type.as_str(),
            path_to_sql(&record.file_path),
            record.original_filename,
            file_size,
            record.mime_type,
            record.thumbnail_path.as_deref().map(path_to_sql),
            record.width,
            record.height,
            record.alt_text,
            record.upload_status.as_str(),
            file_metadata,
            record.processing_error,
            format_timestamp(record.created_at),
            format_timestamp(record.updated_at),
        ],
    )?;
    Ok(())
}

/// Finds a media record by its ID.
pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<MediaRecord>, DatabaseError> {
    conn.query_row(
        "SELECT * FROM entry_media WHERE id = ?1",
        params![id.to_string()],
        MediaRow::from_row,
    )
    .optional()?
    .map(MediaRow::into_record)
    .transpose()
}

/// Moves a record to `processing` and clears any previous error.
/// Returns `false` if no row matched.
pub fn mark_processing(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE entry_media SET upload_status = ?2, processing_error = NULL, updated_at = ?3
         WHERE id = ?1",
        params![
            id.to_string(),
            UploadStatus::Processing.as_str(),
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(updated > 0)
}

/// Records a successful processing run.
pub fn mark_completed(
    conn: &Connection,
    id: Uuid,
    completion: &Completion,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE entry_media SET upload_status = ?2, thumbnail_path = ?3, width = ?4,
         height = ?5, file_metadata = ?6, processing_error = NULL, updated_at = ?7
         WHERE id = ?1",
        params![
            id.to_string(),
            UploadStatus::Completed.as_str(),
            completion.thumbnail_path.as_deref().map(path_to_sql),
            completion.width,
            completion.height,
            completion.file_metadata.as_ref().map(|v| v.to_string()),
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(updated > 0)
}

/// Records a failed processing run with its reason.
pub fn mark_failed(conn: &Connection, id: Uuid, reason: &str) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE entry_media SET upload_status = ?2, processing_error = ?3, updated_at = ?4
         WHERE id = ?1",
        params![
            id.to_string(),
            UploadStatus::Failed.as_str(),
            reason,
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(updated > 0)
}

/// Number of records in the given status.
pub fn count_by_status(conn: &Connection, status: UploadStatus) -> Result<u64, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entry_media WHERE upload_status = ?1",
        params![status.as_str()],
        |r| r.get(0),
    )?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    fn pending(user_id: Uuid) -> MediaRecord {
        MediaRecord::new_pending(
            user_id,
            Some(Uuid::new_v4()),
            MediaType::Image,
            PathBuf::from(format!("{}/photo.png", user_id)),
            "photo.png",
            1024,
            "image/png",
        )
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let record = pending(Uuid::new_v4());

        let found = db
            .with_conn(|conn| {
                insert(conn, &record)?;
                find_by_id(conn, record.id)
            })
            .unwrap()
            .unwrap();

        assert_eq!(found.id, record.id);
        assert_eq!(found.entry_id, record.entry_id);
        assert_eq!(found.file_path, record.file_path);
        assert_eq!(found.file_size, 1024);
        assert_eq!(found.upload_status, UploadStatus::Pending);
        assert!(found.file_metadata.is_none());
    }

    #[test]
    fn test_find_missing() {
        let db = Database::open_in_memory().unwrap();
        let found = db.with_conn(|conn| find_by_id(conn, Uuid::new_v4())).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_status_transitions() {
        let db = Database::open_in_memory().unwrap();
        let record = pending(Uuid::new_v4());

        db.with_conn(|conn| {
            insert(conn, &record)?;
            assert!(mark_processing(conn, record.id)?);
            assert_eq!(
                find_by_id(conn, record.id)?.unwrap().upload_status,
                UploadStatus::Processing
            );

            let completion = Completion {
                thumbnail_path: Some(PathBuf::from("thumbnails/thumb.jpg")),
                width: Some(640),
                height: Some(480),
                file_metadata: Some(json!({"format": "png"})),
            };
            assert!(mark_completed(conn, record.id, &completion)?);

            let done = find_by_id(conn, record.id)?.unwrap();
            assert_eq!(done.upload_status, UploadStatus::Completed);
            assert_eq!(done.width, Some(640));
            assert_eq!(done.height, Some(480));
            assert_eq!(
                done.thumbnail_path,
                Some(PathBuf::from("thumbnails/thumb.jpg"))
            );
            assert_eq!(done.file_metadata, Some(json!({"format": "png"})));
            assert!(done.processing_error.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let db = Database::open_in_memory().unwrap();
        let record = pending(Uuid::new_v4());

        db.with_conn(|conn| {
            insert(conn, &record)?;
            assert!(mark_failed(conn, record.id, "corrupt image")?);
            let failed = find_by_id(conn, record.id)?.unwrap();
            assert_eq!(failed.upload_status, UploadStatus::Failed);
            assert_eq!(failed.processing_error.as_deref(), Some("corrupt image"));
            assert_eq!(count_by_status(conn, UploadStatus::Failed)?, 1);
            assert_eq!(count_by_status(conn, UploadStatus::Pending)?, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_updates_on_missing_row_report_false() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            assert!(!mark_processing(conn, Uuid::new_v4())?);
            assert!(!mark_failed(conn, Uuid::new_v4(), "x")?);
            Ok(())
        })
        .unwrap();
    }
}
