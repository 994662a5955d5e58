//! Application state: owns the database, the mood cache, the worker pool
//! and the upload path for one running backend.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{validate_config, Config};
use crate::db::Database;
use crate::error::Result;
use crate::media::ThumbnailProcessor;
use crate::mood::{seed_default_moods, MoodCache, MoodService};
use crate::storage::MediaStorage;
use crate::upload::{LocalMediaUploader, MediaUploader};
use crate::worker::{MediaJobExecutor, PoolConfig, PoolStatus, WorkerPool};

pub struct AppState {
    config: Config,
    db: Database,
    moods: MoodService,
    storage: MediaStorage,
    pool: Arc<WorkerPool>,
    uploader: Arc<dyn MediaUploader>,
}

impl AppState {
    /// Opens the database, seeds the default moods and wires the pool.
    ///
    /// Workers are not spawned until the first job is submitted.
    pub fn open(config: Config) -> Result<Self> {
        validate_config(&config)?;

        let db = Database::open(&config.database_path)?;
        seed_default_moods(&db)?;

        let moods = MoodService::new(db.clone(), Arc::new(MoodCache::new()));

        let storage = MediaStorage::new(&config.media_root);
        storage.ensure_root()?;

        let processor = Arc::new(ThumbnailProcessor::new(
            storage.clone(),
            &config.thumbnail_directory,
            config.thumbnail_size,
        ));
        let executor = Arc::new(MediaJobExecutor::new(db.clone(), processor));
        let pool = Arc::new(WorkerPool::new(
            PoolConfig {
                worker_count: config.worker_count,
                ..PoolConfig::default()
            },
            executor,
        )?);

        let uploader: Arc<dyn MediaUploader> = Arc::new(LocalMediaUploader::new(
            db.clone(),
            storage.clone(),
            Arc::clone(&pool),
            config.max_upload_bytes,
        ));

        info!(
            "Application state ready (media root {}, {} workers)",
            config.media_root.display(),
            config.worker_count
        );

        Ok(Self {
            config,
            db,
            moods,
            storage,
            pool,
            uploader,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn moods(&self) -> &MoodService {
        &self.moods
    }

    pub fn mood_cache(&self) -> &Arc<MoodCache> {
        self.moods.cache()
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn uploader(&self) -> Arc<dyn MediaUploader> {
        Arc::clone(&self.uploader)
    }

    pub fn processing_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Stops accepting jobs and blocks until queued work has drained.
    pub fn shutdown(&self) {
        info!("Shutting down application state");
        self.pool.shutdown(true);

        let status = self.pool.status();
        if status.failed_jobs > 0 {
            warn!(
                "{} of {} media jobs failed during this run",
                status.failed_jobs,
                status.completed_jobs + status.failed_jobs
            );
        }
        self.moods.invalidate_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JournalError;
    use crate::worker::PoolState;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            database_path: dir.path().join("data").join("journal.db"),
            media_root: dir.path().join("media"),
            worker_count: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_open_seeds_moods_and_creates_media_root() {
        let dir = TempDir::new().unwrap();
        let state = AppState::open(config_in(&dir)).unwrap();

        assert_eq!(state.moods().get_all_moods().unwrap().len(), 12);
        assert_eq!(state.mood_cache().len(), 1);
        assert!(dir.path().join("media").is_dir());
        assert_eq!(state.pool().state(), PoolState::Uninitialized);
        assert_eq!(state.processing_status().max_workers, 2);

        state.shutdown();
        assert_eq!(state.pool().state(), PoolState::Terminated);
        assert!(state.mood_cache().is_empty());
    }

    #[test]
    fn test_open_twice_does_not_duplicate_seed() {
        let dir = TempDir::new().unwrap();
        AppState::open(config_in(&dir)).unwrap().shutdown();

        let state = AppState::open(config_in(&dir)).unwrap();
        assert_eq!(state.moods().get_all_moods().unwrap().len(), 12);
        state.shutdown();
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            worker_count: 0,
            ..config_in(&dir)
        };
        assert!(matches!(
            AppState::open(config),
            Err(JournalError::Config(_))
        ));
        assert!(!dir.path().join("data").exists());
    }
}
