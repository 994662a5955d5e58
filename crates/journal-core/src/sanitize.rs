//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Media paths embed user ids; spans only ever see the file name or a hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of a path for correlation without
/// exposing the actual path.
pub fn hash_path(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/srv/media/3f2a/7c1e.jpg")),
            "7c1e.jpg"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_hash_path_is_stable_and_opaque() {
        let a = hash_path(Path::new("/srv/media/user/a.png"));
        assert_eq!(a, hash_path(Path::new("/srv/media/user/a.png")));
        assert_ne!(a, hash_path(Path::new("/srv/media/user/b.png")));
        assert_eq!(a.len(), 16);
        assert!(!a.contains("user"));
    }
}
