use std::path::PathBuf;

use uuid::Uuid;

use crate::error::WorkerError;

/// A processing request as handed over by the upload path.
///
/// Fields are untrusted strings until [`JobDescriptor::validate`] accepts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub media_id: String,
    pub file_path: PathBuf,
    pub user_id: String,
}

impl JobDescriptor {
    pub fn new(
        media_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            file_path: file_path.into(),
            user_id: user_id.into(),
        }
    }

    /// Checks every field is present and both ids are UUIDs.
    pub fn validate(&self) -> Result<Job, WorkerError> {
        let media_id = self.media_id.trim();
        let user_id = self.user_id.trim();
        let file_path = self.file_path.to_string_lossy();

        if media_id.is_empty() || user_id.is_empty() || file_path.trim().is_empty() {
            return Err(WorkerError::Validation(
                "media_id, file_path, and user_id are required".to_string(),
            ));
        }

        let media_id = Uuid::parse_str(media_id).map_err(|e| {
            WorkerError::Validation(format!("Invalid media_id '{}': {}", self.media_id, e))
        })?;
        let user_id = Uuid::parse_str(user_id).map_err(|e| {
            WorkerError::Validation(format!("Invalid user_id '{}': {}", self.user_id, e))
        })?;

        Ok(Job {
            media_id,
            file_path: self.file_path.clone(),
            user_id,
        })
    }
}

/// A validated job, ready for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub media_id: Uuid,
    /// Relative to the media root.
    pub file_path: PathBuf,
    pub user_id: Uuid,
}

impl Job {
    pub fn new(media_id: Uuid, file_path: impl Into<PathBuf>, user_id: Uuid) -> Self {
        Self {
            media_id,
            file_path: file_path.into(),
            user_id,
        }
    }
}

/// How a job that ran to completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The record was already processed; nothing was written.
    Skipped,
    /// Processing failed and the reason was recorded on the media record.
    Failed(String),
}
