//! Typed writer configuration.
//!
//! # Design
//! - Pure data carrier; loading lives in `loader.rs`.
//! - Values are fixed once a writer is constructed, so validation happens here
//!   rather than at every write.

use std::path::{MAIN_SEPARATOR, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// How each write treats existing file content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Truncate and replace the file content on every write.
    Overwrite,
    /// Concatenate each payload to the existing file content.
    #[default]
    Append,
}

impl WriteMode {
    /// Render the mode as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Append => "append",
        }
    }
}

impl FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "true" => Ok(Self::Overwrite),
            "append" | "false" => Ok(Self::Append),
            _ => Err(ConfigError::invalid(
                "write_mode",
                "unknown_mode",
                Some(value.to_string()),
            )),
        }
    }
}

/// Settings for one writer instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Fixed base directory; `None` means every request names its own.
    pub directory: Option<PathBuf>,
    /// Overwrite or append.
    pub write_mode: WriteMode,
    /// Create missing directories before opening files.
    pub create_dir: bool,
    /// Append the platform line terminator to non-binary payloads.
    #[serde(default = "defaults::append_newline")]
    pub append_newline: bool,
    /// Character encoding label, or `none` for pass-through UTF-8.
    #[serde(default = "defaults::encoding")]
    pub encoding: String,
    /// Replace the payload of emitted messages with an empty object.
    pub clear_payload: bool,
    /// Extension of generated file names, without the dot.
    #[serde(default = "defaults::file_type")]
    pub file_type: String,
    /// Offset from UTC used for timestamp-derived names.
    #[serde(default = "defaults::utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            directory: None,
            write_mode: WriteMode::default(),
            create_dir: false,
            append_newline: defaults::append_newline(),
            encoding: defaults::encoding(),
            clear_payload: false,
            file_type: defaults::file_type(),
            utc_offset_minutes: defaults::utc_offset_minutes(),
        }
    }
}

impl WriterConfig {
    /// Whether the base directory is supplied per request.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.directory.is_none()
    }

    /// Encoding label to apply, or `None` when conversion is disabled.
    #[must_use]
    pub fn encoding_label(&self) -> Option<&str> {
        let label = self.encoding.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(defaults::ENCODING_NONE) {
            None
        } else {
            Some(label)
        }
    }

    /// Check every field against the values a writer can honour.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(directory) = &self.directory
            && directory.as_os_str().is_empty()
        {
            return Err(ConfigError::invalid("directory", "empty", None));
        }

        let file_type = self.file_type.trim();
        if file_type.is_empty() {
            return Err(ConfigError::invalid(
                "file_type",
                "empty",
                Some(self.file_type.clone()),
            ));
        }
        if file_type.contains(['/', '\\', MAIN_SEPARATOR]) {
            return Err(ConfigError::invalid(
                "file_type",
                "contains_separator",
                Some(self.file_type.clone()),
            ));
        }

        if let Some(label) = self.encoding_label()
            && encoding_rs::Encoding::for_label(label.as_bytes()).is_none()
        {
            return Err(ConfigError::invalid(
                "encoding",
                "unknown_encoding",
                Some(label.to_string()),
            ));
        }

        if self.utc_offset_minutes.abs() > defaults::MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::invalid(
                "utc_offset_minutes",
                "out_of_range",
                Some(self.utc_offset_minutes.to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_mode_parses_names_and_legacy_flags() -> anyhow::Result<()> {
        assert_eq!("overwrite".parse::<WriteMode>()?, WriteMode::Overwrite);
        assert_eq!(" Append ".parse::<WriteMode>()?, WriteMode::Append);
        assert_eq!("true".parse::<WriteMode>()?, WriteMode::Overwrite);
        assert_eq!("false".parse::<WriteMode>()?, WriteMode::Append);
        assert!("rotate".parse::<WriteMode>().is_err());
        Ok(())
    }

    #[test]
    fn defaults_fill_missing_fields() -> anyhow::Result<()> {
        let config: WriterConfig = serde_json::from_value(json!({ "directory": "/out" }))?;
        assert_eq!(config.directory, Some(PathBuf::from("/out")));
        assert_eq!(config.write_mode, WriteMode::Append);
        assert!(config.append_newline);
        assert_eq!(config.file_type, "txt");
        assert_eq!(config.utc_offset_minutes, 480);
        assert!(config.encoding_label().is_none());
        assert!(!config.is_dynamic());
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_value::<WriterConfig>(json!({ "filename": "x" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = WriterConfig {
            file_type: "  ".to_string(),
            ..WriterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "file_type",
                reason: "empty",
                ..
            })
        ));

        config.file_type = "a/b".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                reason: "contains_separator",
                ..
            })
        ));

        config.file_type = "jpg".to_string();
        config.encoding = "klingon".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "encoding",
                ..
            })
        ));

        config.encoding = "gbk".to_string();
        config.utc_offset_minutes = 15 * 60;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "utc_offset_minutes",
                ..
            })
        ));

        config.utc_offset_minutes = -600;
        assert!(config.validate().is_ok());

        config.directory = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn encoding_none_is_case_insensitive() {
        let config = WriterConfig {
            encoding: "NONE".to_string(),
            ..WriterConfig::default()
        };
        assert!(config.encoding_label().is_none());
    }
}
