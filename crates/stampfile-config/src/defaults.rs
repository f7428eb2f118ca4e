//! Default values applied when a configuration document omits a field.
//!
//! # Design
//! - Keep defaults in one place so serde defaults and `Default` agree.

/// Extension used for generated file names.
pub const FILE_TYPE: &str = "txt";
/// Encoding name that disables character conversion.
pub const ENCODING_NONE: &str = "none";
/// Offset from UTC, in minutes, used when deriving file names (UTC+8).
pub const UTC_OFFSET_MINUTES: i32 = 480;
/// Largest accepted distance from UTC, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

pub(crate) const fn append_newline() -> bool {
    true
}

pub(crate) fn file_type() -> String {
    FILE_TYPE.to_string()
}

pub(crate) fn encoding() -> String {
    ENCODING_NONE.to_string()
}

pub(crate) const fn utc_offset_minutes() -> i32 {
    UTC_OFFSET_MINUTES
}
