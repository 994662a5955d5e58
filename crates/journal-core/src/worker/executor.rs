use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use crate::db::media_repo::{self, Completion};
use crate::db::{Database, UnitOfWork};
use crate::error::ProcessError;
use crate::media::{MediaProcessor, UploadStatus};
use crate::worker::job::{Job, JobOutcome};
use crate::worker::panic_message;

/// Runs one job on a worker thread.
///
/// `Err` means there was no record the job could update (missing record,
/// mismatched owner or path, no session). Every failure after the record
/// was claimed is recorded and reported as [`JobOutcome::Failed`].
pub trait JobExecutor: Send + Sync {
    fn execute(&self, job: &Job) -> Result<JobOutcome, ProcessError>;
}

/// Processes uploaded media and records the result on its `entry_media` row.
///
/// Every job opens its own [`crate::db::UnitOfWork`]; the connection is
/// closed when the job returns, whichever way it ends.
pub struct MediaJobExecutor {
    db: Database,
    processor: Arc<dyn MediaProcessor>,
}

impl MediaJobExecutor {
    pub fn new(db: Database, processor: Arc<dyn MediaProcessor>) -> Self {
        Self { db, processor }
    }
}

impl MediaJobExecutor {
    /// Commits `failed` with `reason`. A write error here is logged; the
    /// job still ends as failed.
    fn record_failure(
        &self,
        session: &mut UnitOfWork,
        id: Uuid,
        reason: String,
    ) -> Result<JobOutcome, ProcessError> {
        match session.run(|tx| media_repo::mark_failed(tx, id, &reason)) {
            Ok(true) => {}
            Ok(false) => return Err(ProcessError::RecordNotFound(id.to_string())),
            Err(e) => error!("Could not mark media {} as failed: {}", id, e),
        }
        Ok(JobOutcome::Failed(reason))
    }
}

impl JobExecutor for MediaJobExecutor {
    fn execute(&self, job: &Job) -> Result<JobOutcome, ProcessError> {
        let mut session = self.db.open_session()?;

        let record = media_repo::find_by_id(session.connection(), job.media_id)?
            .ok_or_else(|| ProcessError::RecordNotFound(job.media_id.to_string()))?;

        if record.user_id != job.user_id {
            warn!(
                "Media {} left {}: job submitted for another user",
                record.id, record.upload_status
            );
            return Err(ProcessError::OwnerMismatch {
                media_id: job.media_id.to_string(),
                user_id: job.user_id.to_string(),
            });
        }
        if record.file_path != job.file_path {
            warn!(
                "Media {} left {}: job path does not match the stored file",
                record.id, record.upload_status
            );
            return Err(ProcessError::PathMismatch {
                media_id: job.media_id.to_string(),
                job_path: job.file_path.clone(),
            });
        }
        if record.upload_status == UploadStatus::Completed {
            info!("Media {} already processed, skipping", record.id);
            return Ok(JobOutcome::Skipped);
        }

        match session.run(|tx| media_repo::mark_processing(tx, record.id)) {
            Ok(true) => {}
            Ok(false) => return Err(ProcessError::RecordNotFound(record.id.to_string())),
            Err(e) => {
                let reason = format!("Failed to record processing start: {}", e);
                warn!("Media {}: {}", record.id, reason);
                return self.record_failure(&mut session, record.id, reason);
            }
        }

        let processed = panic::catch_unwind(AssertUnwindSafe(|| self.processor.process(&record)))
            .unwrap_or_else(|payload| {
                Err(ProcessError::Panicked(panic_message(payload.as_ref())))
            });

        let processed = match processed {
            Ok(processed) => processed,
            Err(e) => {
                let reason = e.to_string();
                warn!("Processing failed for media {}: {}", record.id, reason);
                return self.record_failure(&mut session, record.id, reason);
            }
        };

        let completion = Completion {
            thumbnail_path: processed.thumbnail_path.clone(),
            width: processed.width,
            height: processed.height,
            file_metadata: Some(processed.metadata.clone()),
        };
        match session.run(|tx| media_repo::mark_completed(tx, record.id, &completion)) {
            Ok(true) => Ok(JobOutcome::Completed),
            Ok(false) => {
                self.processor.discard(&processed);
                Err(ProcessError::RecordNotFound(record.id.to_string()))
            }
            Err(e) => {
                self.processor.discard(&processed);
                let reason = format!("Failed to record result: {}", e);
                warn!("Media {}: {}", record.id, reason);
                self.record_failure(&mut session, record.id, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaRecord, MediaType, ProcessedMedia};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct FixedProcessor(fn() -> Result<ProcessedMedia, ProcessError>);

    impl MediaProcessor for FixedProcessor {
        fn process(&self, _record: &MediaRecord) -> Result<ProcessedMedia, ProcessError> {
            (self.0)()
        }
    }

    fn ok_processor() -> Result<ProcessedMedia, ProcessError> {
        Ok(ProcessedMedia {
            thumbnail_path: Some(PathBuf::from("thumbnails/t.jpg")),
            width: Some(10),
            height: Some(20),
            metadata: serde_json::json!({"size": 3}),
        })
    }

    fn failing_processor() -> Result<ProcessedMedia, ProcessError> {
        Err(ProcessError::ImageProcessing("bad pixels".to_string()))
    }

    fn panicking_processor() -> Result<ProcessedMedia, ProcessError> {
        panic!("decoder exploded")
    }

    fn setup() -> (TempDir, Database, MediaRecord) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("journal.db")).unwrap();
        let record = MediaRecord::new_pending(
            Uuid::new_v4(),
            None,
            MediaType::Image,
            PathBuf::from("u/a.png"),
            "a.png",
            3,
            "image/png",
        );
        db.with_conn(|conn| media_repo::insert(conn, &record)).unwrap();
        (dir, db, record)
    }

    fn job_for(record: &MediaRecord) -> Job {
        Job::new(record.id, record.file_path.clone(), record.user_id)
    }

    /// Runs `sql` against the database from inside the processing step.
    /// `{id}` is replaced with the record id.
    struct HookProcessor {
        db: Database,
        sql: &'static str,
        discarded: AtomicBool,
    }

    impl HookProcessor {
        fn new(db: &Database, sql: &'static str) -> Arc<Self> {
            Arc::new(Self {
                db: db.clone(),
                sql,
                discarded: AtomicBool::new(false),
            })
        }
    }

    impl MediaProcessor for HookProcessor {
        fn process(&self, record: &MediaRecord) -> Result<ProcessedMedia, ProcessError> {
            let sql = self.sql.replace("{id}", &record.id.to_string());
            self.db
                .with_conn(|conn| Ok(conn.execute_batch(&sql)?))
                .unwrap();
            ok_processor()
        }

        fn discard(&self, _processed: &ProcessedMedia) {
            self.discarded.store(true, Ordering::SeqCst);
        }
    }

    const FAIL_ON_COMPLETED: &str = "CREATE TRIGGER fail_completion BEFORE UPDATE ON entry_media
         WHEN NEW.upload_status = 'completed'
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;";

    fn reload(db: &Database, id: Uuid) -> MediaRecord {
        db.with_conn(|conn| media_repo::find_by_id(conn, id))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_success_marks_completed() {
        let (_dir, db, record) = setup();
        let executor = MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(ok_processor)));

        assert_eq!(executor.execute(&job_for(&record)).unwrap(), JobOutcome::Completed);

        let stored = reload(&db, record.id);
        assert_eq!(stored.upload_status, UploadStatus::Completed);
        assert_eq!(stored.width, Some(10));
        assert_eq!(stored.thumbnail_path, Some(PathBuf::from("thumbnails/t.jpg")));
    }

    #[test]
    fn test_processing_error_marks_failed() {
        let (_dir, db, record) = setup();
        let executor =
            MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(failing_processor)));

        let outcome = executor.execute(&job_for(&record)).unwrap();
        assert!(matches!(outcome, JobOutcome::Failed(ref r) if r.contains("bad pixels")));

        let stored = reload(&db, record.id);
        assert_eq!(stored.upload_status, UploadStatus::Failed);
        assert!(stored.processing_error.unwrap().contains("bad pixels"));
    }

    #[test]
    fn test_panic_is_recorded_as_failure() {
        let (_dir, db, record) = setup();
        let executor =
            MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(panicking_processor)));

        let outcome = executor.execute(&job_for(&record)).unwrap();
        assert!(matches!(outcome, JobOutcome::Failed(ref r) if r.contains("decoder exploded")));
        assert_eq!(reload(&db, record.id).upload_status, UploadStatus::Failed);
    }

    #[test]
    fn test_missing_record() {
        let (_dir, db, record) = setup();
        let executor = MediaJobExecutor::new(db, Arc::new(FixedProcessor(ok_processor)));

        let job = Job::new(Uuid::new_v4(), record.file_path.clone(), record.user_id);
        assert!(matches!(
            executor.execute(&job),
            Err(ProcessError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_owner_mismatch_leaves_record_untouched() {
        let (_dir, db, record) = setup();
        let executor = MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(ok_processor)));

        let job = Job::new(record.id, record.file_path.clone(), Uuid::new_v4());
        assert!(matches!(
            executor.execute(&job),
            Err(ProcessError::OwnerMismatch { .. })
        ));
        assert_eq!(reload(&db, record.id).upload_status, UploadStatus::Pending);
    }

    #[test]
    fn test_completed_record_is_skipped() {
        let (_dir, db, record) = setup();
        let executor = MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(ok_processor)));
        executor.execute(&job_for(&record)).unwrap();

        let failing =
            MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(failing_processor)));
        assert_eq!(failing.execute(&job_for(&record)).unwrap(), JobOutcome::Skipped);
        assert_eq!(reload(&db, record.id).upload_status, UploadStatus::Completed);
    }

    #[test]
    fn test_in_memory_database_cannot_run_jobs() {
        let db = Database::open_in_memory().unwrap();
        let executor = MediaJobExecutor::new(db, Arc::new(FixedProcessor(ok_processor)));
        let job = Job::new(Uuid::new_v4(), "u/a.png", Uuid::new_v4());
        assert!(matches!(
            executor.execute(&job),
            Err(ProcessError::Database(_))
        ));
    }

    #[test]
    fn test_completion_write_failure_marks_failed() {
        let (_dir, db, record) = setup();
        let processor = HookProcessor::new(&db, FAIL_ON_COMPLETED);
        let executor = MediaJobExecutor::new(db.clone(), processor.clone());

        let outcome = executor.execute(&job_for(&record)).unwrap();
        assert!(matches!(outcome, JobOutcome::Failed(ref r) if r.contains("disk full")));
        assert!(processor.discarded.load(Ordering::SeqCst));

        let stored = reload(&db, record.id);
        assert_eq!(stored.upload_status, UploadStatus::Failed);
        assert!(stored.processing_error.unwrap().contains("disk full"));
        assert!(stored.thumbnail_path.is_none());
    }

    #[test]
    fn test_processing_start_write_failure_marks_failed() {
        let (_dir, db, record) = setup();
        db.with_conn(|conn| {
            Ok(conn.execute_batch(
                "CREATE TRIGGER fail_claim BEFORE UPDATE ON entry_media
                 WHEN NEW.upload_status = 'processing'
                 BEGIN SELECT RAISE(ABORT, 'database is read-only'); END;",
            )?)
        })
        .unwrap();
        let executor = MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(ok_processor)));

        let outcome = executor.execute(&job_for(&record)).unwrap();
        assert!(matches!(outcome, JobOutcome::Failed(ref r) if r.contains("read-only")));

        let stored = reload(&db, record.id);
        assert_eq!(stored.upload_status, UploadStatus::Failed);
        assert!(stored.processing_error.unwrap().contains("read-only"));
    }

    #[test]
    fn test_record_deleted_during_processing() {
        let (_dir, db, record) = setup();
        let processor = HookProcessor::new(&db, "DELETE FROM entry_media WHERE id = '{id}';");
        let executor = MediaJobExecutor::new(db.clone(), processor.clone());

        assert!(matches!(
            executor.execute(&job_for(&record)),
            Err(ProcessError::RecordNotFound(_))
        ));
        assert!(processor.discarded.load(Ordering::SeqCst));
        assert!(db
            .with_conn(|conn| media_repo::find_by_id(conn, record.id))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_path_mismatch_leaves_record_untouched() {
        let (_dir, db, record) = setup();
        let executor = MediaJobExecutor::new(db.clone(), Arc::new(FixedProcessor(ok_processor)));

        let job = Job::new(record.id, "u/other.png", record.user_id);
        assert!(matches!(
            executor.execute(&job),
            Err(ProcessError::PathMismatch { .. })
        ));
        assert_eq!(reload(&db, record.id).upload_status, UploadStatus::Pending);
    }
}
