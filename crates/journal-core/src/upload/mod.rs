//! Media upload: validate, store, record, and hand off for processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{media_repo, Database};
use crate::error::UploadError;
use crate::media::{MediaRecord, MediaType, UploadStatus};
use crate::storage::MediaStorage;
use crate::worker::{JobDescriptor, WorkerPool};

/// An incoming file attached to a journal entry.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: Uuid,
    pub entry_id: Option<Uuid>,
    pub filename: String,
    /// Declared content type; guessed from `filename` when absent.
    pub content_type: Option<String>,
    pub alt_text: Option<String>,
    pub data: Vec<u8>,
}

/// The stored media record as returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub id: Uuid,
    pub entry_id: Option<Uuid>,
    pub media_type: MediaType,
    pub file_path: PathBuf,
    pub original_filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub upload_status: UploadStatus,
    /// Whether background processing was scheduled.
    pub processing_queued: bool,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_media(&self, request: UploadRequest) -> Result<UploadedMedia, UploadError>;
}

/// Stores uploads under the media root and queues them on the worker pool.
pub struct LocalMediaUploader {
    db: Database,
    storage: MediaStorage,
    pool: Arc<WorkerPool>,
    max_upload_bytes: u64,
}

impl LocalMediaUploader {
    pub fn new(
        db: Database,
        storage: MediaStorage,
        pool: Arc<WorkerPool>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            db,
            storage,
            pool,
            max_upload_bytes,
        }
    }

    fn store(
        db: &Database,
        storage: &MediaStorage,
        request: UploadRequest,
        media_type: MediaType,
        mime_type: &str,
        extension: &str,
    ) -> Result<MediaRecord, UploadError> {
        let file_path = storage.save_upload(request.user_id, extension, &request.data)?;

        let mut record = MediaRecord::new_pending(
            request.user_id,
            request.entry_id,
            media_type,
            file_path,
            &request.filename,
            request.data.len() as u64,
            mime_type,
        );
        record.alt_text = request.alt_text;

        if let Err(e) = db.with_conn(|conn| media_repo::insert(conn, &record)) {
            if let Err(cleanup) = storage.remove(&record.file_path) {
                log::warn!(
                    "Failed to remove orphaned upload {}: {}",
                    record.file_path.display(),
                    cleanup
                );
            }
            return Err(e.into());
        }
        Ok(record)
    }
}

#[async_trait]
impl MediaUploader for LocalMediaUploader {
    async fn upload_media(&self, request: UploadRequest) -> Result<UploadedMedia, UploadError> {
        let size = request.data.len() as u64;
        if size == 0 {
            return Err(UploadError::EmptyFile);
        }
        if size > self.max_upload_bytes {
            return Err(UploadError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let mime_type = resolve_mime_type(request.content_type.as_deref(), &request.filename);
        let media_type = MediaType::from_mime(&mime_type)
            .ok_or_else(|| UploadError::UnsupportedType(mime_type.clone()))?;
        let extension = file_extension(&request.filename, &mime_type);

        let db = self.db.clone();
        let storage = self.storage.clone();
        let mime = mime_type.clone();
        let record = tokio::task::spawn_blocking(move || {
            Self::store(&db, &storage, request, media_type, &mime, &extension)
        })
        .await
        .map_err(|e| UploadError::Task(e.to_string()))??;

        let descriptor = JobDescriptor::new(
            record.id.to_string(),
            record.file_path.clone(),
            record.user_id.to_string(),
        );
        let processing_queued = match self.pool.submit(descriptor) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Media {} stored but not queued for processing: {}",
                    record.id,
                    e
                );
                false
            }
        };

        log::info!(
            "Uploaded {} ({} bytes, {}) for user {}",
            record.id,
            record.file_size,
            record.mime_type,
            record.user_id
        );

        Ok(UploadedMedia {
            id: record.id,
            entry_id: record.entry_id,
            media_type: record.media_type,
            file_path: record.file_path,
            original_filename: record.original_filename,
            file_size: record.file_size,
            mime_type: record.mime_type,
            upload_status: record.upload_status,
            processing_queued,
        })
    }
}

/// Declared content type if it is specific, otherwise a guess from the
/// filename.
fn resolve_mime_type(declared: Option<&str>, filename: &str) -> String {
    let declared = declared
        .map(|m| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.unwrap_or_else(|| {
        mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    })
}

fn file_extension(filename: &str, mime_type: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(mime_type)
                .and_then(|exts| exts.first())
                .map(|e| (*e).to_string())
        })
        .unwrap_or_default()
}
