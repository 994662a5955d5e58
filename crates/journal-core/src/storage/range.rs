//! `Range: bytes=...` header parsing for partial media reads.

use std::fmt;

use crate::error::StorageError;

/// An inclusive byte range within a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, both ends included.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a file of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parses a single-range `Range` header against a file of `file_size` bytes.
///
/// Accepts `bytes=a-b`, open-ended `bytes=a-` and suffix `bytes=-n`.
/// Malformed headers yield [`StorageError::InvalidRange`]; well-formed ranges
/// outside the file yield [`StorageError::RangeNotSatisfiable`].
pub fn parse_range_header(header: &str, file_size: u64) -> Result<ByteRange, StorageError> {
    let invalid = || StorageError::InvalidRange(header.to_string());

    let spec = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    let (start_str, end_str) = spec.split_once('-').ok_or_else(invalid)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let parse = |s: &str| s.parse::<u64>().map_err(|_| invalid());

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return Err(invalid()),
        (true, false) => {
            let suffix = parse(end_str)?;
            if suffix == 0 {
                return Err(StorageError::RangeNotSatisfiable(header.to_string()));
            }
            (file_size.saturating_sub(suffix), file_size.saturating_sub(1))
        }
        (false, true) => (parse(start_str)?, file_size.saturating_sub(1)),
        (false, false) => (parse(start_str)?, parse(end_str)?),
    };

    if file_size == 0 || start >= file_size || end >= file_size || start > end {
        return Err(StorageError::RangeNotSatisfiable(format!(
            "{} for {} bytes",
            header.trim(),
            file_size
        )));
    }

    Ok(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_range() {
        let range = parse_range_header("bytes=0-99", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 99 });
        assert_eq!(range.byte_count(), 100);
        assert_eq!(range.content_range(1000), "bytes 0-99/1000");
    }

    #[test]
    fn test_open_ended_range() {
        let range = parse_range_header("bytes=500-", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
    }

    #[test]
    fn test_suffix_range() {
        let range = parse_range_header("bytes=-100", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 900, end: 999 });

        // Suffix longer than the file covers the whole file.
        let range = parse_range_header("bytes=-5000", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 999 });
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        for header in ["bytes=1000-", "bytes=0-1000", "bytes=50-10", "bytes=-0"] {
            assert!(
                matches!(
                    parse_range_header(header, 1000),
                    Err(StorageError::RangeNotSatisfiable(_))
                ),
                "{header} should be unsatisfiable"
            );
        }
        assert!(matches!(
            parse_range_header("bytes=0-", 0),
            Err(StorageError::RangeNotSatisfiable(_))
        ));
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["items=0-10", "bytes=abc-def", "bytes=-", "bytes=10"] {
            assert!(
                matches!(
                    parse_range_header(header, 1000),
                    Err(StorageError::InvalidRange(_))
                ),
                "{header} should be invalid"
            );
        }
    }
}
