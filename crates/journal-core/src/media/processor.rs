use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::json;

use super::{MediaRecord, MediaType};
use crate::error::ProcessError;
use crate::storage::MediaStorage;

/// Derived data produced for one media record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedMedia {
    /// Relative to the media root.
    pub thumbnail_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub metadata: serde_json::Value,
}

pub trait MediaProcessor: Send + Sync {
    fn process(&self, record: &MediaRecord) -> Result<ProcessedMedia, ProcessError>;

    /// Removes files written by `process` whose result was never recorded.
    fn discard(&self, _processed: &ProcessedMedia) {}
}

/// Generates JPEG thumbnails for images and basic file metadata for every
/// media type.
pub struct ThumbnailProcessor {
    storage: MediaStorage,
    thumbnail_directory: PathBuf,
    max_dimension: u32,
}

impl ThumbnailProcessor {
    pub fn new(storage: MediaStorage, thumbnail_directory: &str, max_dimension: u32) -> Self {
        Self {
            storage,
            thumbnail_directory: PathBuf::from(thumbnail_directory),
            max_dimension,
        }
    }

    fn process_image(
        &self,
        record: &MediaRecord,
        data: &[u8],
    ) -> Result<ProcessedMedia, ProcessError> {
        let _span = tracing::info_span!("processor.thumbnail").entered();

        let format = image::guess_format(data)
            .map_err(|e| ProcessError::ImageProcessing(format!("Unknown image format: {}", e)))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to load image: {}", e)))?;
        let (width, height) = img.dimensions();

        // JPEG has no alpha channel
        let thumb = DynamicImage::ImageRgb8(
            img.thumbnail(self.max_dimension, self.max_dimension)
                .to_rgb8(),
        );
        let mut encoded = Cursor::new(Vec::new());
        thumb.write_to(&mut encoded, ImageFormat::Jpeg).map_err(|e| {
            ProcessError::ImageProcessing(format!("Failed to encode thumbnail: {}", e))
        })?;

        let relative = self
            .thumbnail_directory
            .join(format!("{}_thumb.jpg", record.id));
        self.storage.write(&relative, encoded.get_ref())?;

        log::debug!(
            "Thumbnail {}x{} written for media {}",
            thumb.width(),
            thumb.height(),
            record.id
        );

        Ok(ProcessedMedia {
            thumbnail_path: Some(relative),
            width: Some(width),
            height: Some(height),
            metadata: json!({
                "size": data.len(),
                "mime_type": record.mime_type,
                "format": format.extensions_str().first().copied().unwrap_or("unknown"),
            }),
        })
    }
}

impl MediaProcessor for ThumbnailProcessor {
    fn process(&self, record: &MediaRecord) -> Result<ProcessedMedia, ProcessError> {
        let path = self.storage.resolve(&record.file_path)?;
        let data = std::fs::read(&path).map_err(|e| ProcessError::ReadMedia {
            path: path.clone(),
            source: e,
        })?;

        match record.media_type {
            MediaType::Image => self.process_image(record, &data),
            MediaType::Video | MediaType::Audio => Ok(ProcessedMedia {
                metadata: json!({
                    "size": data.len(),
                    "mime_type": record.mime_type,
                }),
                ..ProcessedMedia::default()
            }),
        }
    }

    fn discard(&self, processed: &ProcessedMedia) {
        if let Some(thumbnail) = &processed.thumbnail_path {
            if let Err(e) = self.storage.remove(thumbnail) {
                log::warn!("Failed to remove thumbnail {}: {}", thumbnail.display(), e);
            }
        }
    }
}
