pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;
pub mod mood;
pub mod sanitize;
pub mod storage;
pub mod upload;
pub mod worker;

pub use app::AppState;
pub use config::{load_config, Config, LoggingConfig};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, JournalError, MoodError, ProcessError, Result, StorageError, UploadError,
    WorkerError,
};
pub use media::{MediaRecord, MediaType, UploadStatus};
pub use mood::{CacheKey, Mood, MoodCache, MoodCategory, MoodService};
pub use storage::{parse_range_header, ByteRange, MediaStorage};
pub use upload::{LocalMediaUploader, MediaUploader, UploadRequest, UploadedMedia};
pub use worker::{JobDescriptor, PoolConfig, PoolState, PoolStatus, WorkerPool};
