//! Isolated environment for integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use uuid::Uuid;

use journal_core::db::media_repo;
use journal_core::{AppState, Config, MediaRecord, MediaType};

pub struct TestHarness {
    temp_dir: TempDir,
    pub database_path: PathBuf,
    pub media_root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let database_path = temp_dir.path().join("data").join("journal.db");
        let media_root = temp_dir.path().join("media");

        Self {
            temp_dir,
            database_path,
            media_root,
        }
    }

    pub fn config(&self, worker_count: usize) -> Config {
        Config {
            database_path: self.database_path.clone(),
            media_root: self.media_root.clone(),
            worker_count,
            thumbnail_size: 32,
            max_upload_bytes: 1024 * 1024,
            ..Config::default()
        }
    }

    /// Opens application state with seeded moods.
    pub fn open_state(&self, worker_count: usize) -> AppState {
        AppState::open(self.config(worker_count)).expect("Failed to open application state")
    }

    /// Stores `data` for `user_id` and inserts a pending record for it.
    pub fn add_media(
        &self,
        state: &AppState,
        user_id: Uuid,
        media_type: MediaType,
        mime_type: &str,
        data: &[u8],
    ) -> MediaRecord {
        let path = state
            .storage()
            .save_upload(user_id, "bin", data)
            .expect("Failed to store media");
        let record = MediaRecord::new_pending(
            user_id,
            None,
            media_type,
            path,
            "fixture.bin",
            data.len() as u64,
            mime_type,
        );
        state
            .database()
            .with_conn(|conn| media_repo::insert(conn, &record))
            .expect("Failed to insert media record");
        record
    }

    pub fn reload(&self, state: &AppState, id: Uuid) -> MediaRecord {
        state
            .database()
            .with_conn(|conn| media_repo::find_by_id(conn, id))
            .expect("Failed to read media record")
            .expect("Media record missing")
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 120, 220]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}
