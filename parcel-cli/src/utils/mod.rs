mod headers;
pub mod progress;
mod size;

pub use self::headers::parse_header;
pub use self::size::format_bytes;
