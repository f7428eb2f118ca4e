//! File name generation.
//!
//! Names are opaque to the stream manager; it only joins them onto the base
//! directory.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rand::Rng;
use stampfile_config::WriterConfig;

/// Generated location of one write, relative to the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedName {
    /// Directory segment below the base directory.
    pub subdirectory: String,
    /// Leaf file name.
    pub file_name: String,
}

/// Produces the location of each write.
pub trait NameGenerator: Send + Sync {
    /// Generate a name for a write happening at `now`.
    fn generate(&self, now: DateTime<Utc>) -> GeneratedName;
}

/// `YYYY-MM-DD/YYYY-MM-DD-HH-mm-ss-N.ext` in a fixed UTC offset, where `N` is
/// a random tie-breaker in `0..=100`.
#[derive(Debug, Clone)]
pub struct TimestampNames {
    offset: FixedOffset,
    file_type: String,
}

impl TimestampNames {
    /// Generator using the offset and extension from `config`.
    #[must_use]
    pub fn from_config(config: &WriterConfig) -> Self {
        Self::new(config.utc_offset_minutes, &config.file_type)
    }

    /// Generator for `offset_minutes` east of UTC; out-of-range offsets fall
    /// back to UTC.
    #[must_use]
    pub fn new(offset_minutes: i32, file_type: &str) -> Self {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self {
            offset,
            file_type: file_type.trim().trim_start_matches('.').to_string(),
        }
    }
}

impl NameGenerator for TimestampNames {
    fn generate(&self, now: DateTime<Utc>) -> GeneratedName {
        let local = now.with_timezone(&self.offset);
        let tie_breaker: u8 = rand::rng().random_range(0..=100);
        GeneratedName {
            subdirectory: local.format("%Y-%m-%d").to_string(),
            file_name: format!(
                "{}-{tie_breaker}.{}",
                local.format("%Y-%m-%d-%H-%M-%S"),
                self.file_type
            ),
        }
    }
}

/// Always yields the same location.
#[derive(Debug, Clone)]
pub struct FixedName {
    name: GeneratedName,
}

impl FixedName {
    /// Generator placing every write at `subdirectory/file_name`.
    #[must_use]
    pub fn new(subdirectory: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            name: GeneratedName {
                subdirectory: subdirectory.into(),
                file_name: file_name.into(),
            },
        }
    }
}

impl NameGenerator for FixedName {
    fn generate(&self, _now: DateTime<Utc>) -> GeneratedName {
        self.name.clone()
    }
}
