pub mod filesystem;
pub mod range;

pub use filesystem::MediaStorage;
pub use range::{parse_range_header, ByteRange};
