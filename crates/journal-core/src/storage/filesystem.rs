use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::range::ByteRange;
use crate::error::StorageError;

/// Chunk size for ranged copies.
const CHUNK_SIZE: usize = 8 * 1024;

/// Media files under a single root directory.
///
/// Every public method takes paths relative to the root; [`MediaStorage::resolve`]
/// refuses anything that would land outside it.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StorageError::CreateDirectory {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Joins `relative` onto the root, rejecting absolute paths and parent
    /// components.
    pub fn resolve<P: AsRef<Path>>(&self, relative: P) -> Result<PathBuf, StorageError> {
        let relative = relative.as_ref();
        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::PathTraversal(
                        relative.display().to_string(),
                    ));
                }
            }
        }
        if clean.as_os_str().is_empty() {
            return Err(StorageError::PathTraversal(relative.display().to_string()));
        }
        Ok(self.root.join(clean))
    }

    /// Stores an upload as `<user_id>/<uuid>.<ext>` and returns that relative
    /// path.
    pub fn save_upload(
        &self,
        user_id: Uuid,
        extension: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        let filename = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        let relative = PathBuf::from(user_id.to_string()).join(filename);

        self.create_new(&relative, content)?;
        log::debug!("Stored {} bytes at {}", content.len(), relative.display());
        Ok(relative)
    }

    /// Writes `content` to `relative`, replacing any existing file.
    pub fn write<P: AsRef<Path>>(
        &self,
        relative: P,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let path = self.resolve(&relative)?;
        self.ensure_parent(&path)?;
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Size in bytes of a stored file.
    pub fn file_size<P: AsRef<Path>>(&self, relative: P) -> Result<u64, StorageError> {
        let path = self.resolve(relative)?;
        let metadata = std::fs::metadata(&path).map_err(|e| read_error(&path, e))?;
        Ok(metadata.len())
    }

    /// Reads an inclusive byte range.
    pub fn read_range<P: AsRef<Path>>(
        &self,
        relative: P,
        range: ByteRange,
    ) -> Result<Vec<u8>, StorageError> {
        let capacity = range.byte_count().min(CHUNK_SIZE as u64 * 16) as usize;
        let mut buf = Vec::with_capacity(capacity);
        self.copy_range(relative, range, &mut buf)?;
        Ok(buf)
    }

    /// Copies an inclusive byte range into `out` in fixed-size chunks.
    /// Returns the number of bytes copied, which is short only if the file
    /// shrank underneath us.
    pub fn copy_range<P: AsRef<Path>, W: Write>(
        &self,
        relative: P,
        range: ByteRange,
        out: &mut W,
    ) -> Result<u64, StorageError> {
        let path = self.resolve(relative)?;
        let mut file = File::open(&path).map_err(|e| read_error(&path, e))?;
        file.seek(SeekFrom::Start(range.start))
            .map_err(|e| read_error(&path, e))?;

        let mut remaining = range.byte_count();
        let mut chunk = [0u8; CHUNK_SIZE];
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            let read = file
                .read(&mut chunk[..want])
                .map_err(|e| read_error(&path, e))?;
            if read == 0 {
                break;
            }
            out.write_all(&chunk[..read])
                .map_err(|e| StorageError::WriteFile {
                    path: path.clone(),
                    source: e,
                })?;
            remaining -= read as u64;
        }

        Ok(range.byte_count() - remaining)
    }

    /// Writes `content` at `offset` without truncating the file. The file is
    /// created if missing.
    pub fn write_at<P: AsRef<Path>>(
        &self,
        relative: P,
        offset: u64,
        content: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.resolve(relative)?;
        self.ensure_parent(&path)?;
        let write_error = |e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(write_error)?;
        file.seek(SeekFrom::Start(offset)).map_err(write_error)?;
        file.write_all(content).map_err(write_error)?;
        Ok(())
    }

    /// Deletes a stored file. Missing files are not an error.
    pub fn remove<P: AsRef<Path>>(&self, relative: P) -> Result<(), StorageError> {
        let path = self.resolve(relative)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFile { path, source: e }),
        }
    }

    fn create_new(&self, relative: &Path, content: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(relative)?;
        self.ensure_parent(&path)?;

        // create_new fails instead of clobbering on a uuid collision
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(content)
            .map_err(|e| StorageError::WriteFile { path, source: e })
    }

    fn ensure_parent(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }
}

fn read_error(path: &Path, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_path_buf())
    } else {
        StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        }
    }
}
