use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Mood error: {0}")]
    Mood(#[from] MoodError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to install signal handler: {0}")]
    Signal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Failed to read media '{path}': {source}")]
    ReadMedia {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("Media record {0} not found")]
    RecordNotFound(String),

    #[error("Media record {media_id} is not owned by user {user_id}")]
    OwnerMismatch { media_id: String, user_id: String },

    #[error("Job path '{job_path}' does not match media record {media_id}")]
    PathMismatch { media_id: String, job_path: PathBuf },

    #[error("Processing panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path escapes media root: {0}")]
    PathTraversal(String),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid range header: {0}")]
    InvalidRange(String),

    #[error("Range not satisfiable: {0}")]
    RangeNotSatisfiable(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Processing pool is unavailable (shutting down)")]
    PoolUnavailable,

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),
}

#[derive(Error, Debug)]
pub enum MoodError {
    #[error("Invalid mood category '{0}'")]
    InvalidCategory(String),

    #[error("Mood name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Upload task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, JournalError>;
