//! Configuration loading from JSON documents and environment variables.
//!
//! # Design
//! - Environment lookups go through a closure so tests never mutate the
//!   process environment.
//! - Overrides are applied on top of the file document, then validated once.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::WriterConfig;

/// Points at an optional JSON configuration document.
pub const ENV_CONFIG_PATH: &str = "STAMPFILE_CONFIG";
const ENV_DIRECTORY: &str = "STAMPFILE_DIRECTORY";
const ENV_MODE: &str = "STAMPFILE_MODE";
const ENV_CREATE_DIR: &str = "STAMPFILE_CREATE_DIR";
const ENV_APPEND_NEWLINE: &str = "STAMPFILE_APPEND_NEWLINE";
const ENV_ENCODING: &str = "STAMPFILE_ENCODING";
const ENV_CLEAR_PAYLOAD: &str = "STAMPFILE_CLEAR_PAYLOAD";
const ENV_FILE_TYPE: &str = "STAMPFILE_FILE_TYPE";
const ENV_UTC_OFFSET: &str = "STAMPFILE_UTC_OFFSET_MINUTES";

/// Parse a JSON configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Parse`] when it does not describe a writer configuration.
pub fn load_from_path(path: &Path) -> ConfigResult<WriterConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `STAMPFILE_*` overrides resolved through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an override cannot be parsed.
pub fn apply_env_overrides<F>(mut config: WriterConfig, lookup: F) -> ConfigResult<WriterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(directory) = lookup(ENV_DIRECTORY) {
        let trimmed = directory.trim();
        config.directory = if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        };
    }
    if let Some(mode) = lookup(ENV_MODE) {
        config.write_mode = mode.parse()?;
    }
    if let Some(value) = lookup(ENV_CREATE_DIR) {
        config.create_dir = parse_bool("create_dir", &value)?;
    }
    if let Some(value) = lookup(ENV_APPEND_NEWLINE) {
        config.append_newline = parse_bool("append_newline", &value)?;
    }
    if let Some(encoding) = lookup(ENV_ENCODING) {
        config.encoding = encoding.trim().to_string();
    }
    if let Some(value) = lookup(ENV_CLEAR_PAYLOAD) {
        config.clear_payload = parse_bool("clear_payload", &value)?;
    }
    if let Some(file_type) = lookup(ENV_FILE_TYPE) {
        config.file_type = file_type.trim().trim_start_matches('.').to_string();
    }
    if let Some(value) = lookup(ENV_UTC_OFFSET) {
        config.utc_offset_minutes = value.trim().parse().map_err(|_| {
            ConfigError::invalid("utc_offset_minutes", "not_an_integer", Some(value.clone()))
        })?;
    }
    Ok(config)
}

/// Build a validated configuration from the process environment.
///
/// # Errors
///
/// Returns an error when the referenced document cannot be loaded, an override
/// is malformed, or the result fails validation.
pub fn load_from_env() -> ConfigResult<WriterConfig> {
    load_with(|name| std::env::var(name).ok())
}

fn load_with<F>(lookup: F) -> ConfigResult<WriterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup(ENV_CONFIG_PATH) {
        Some(path) => {
            debug!(path = %path, "loading writer configuration document");
            load_from_path(Path::new(&path))?
        }
        None => WriterConfig::default(),
    };
    let config = apply_env_overrides(base, lookup)?;
    config.validate()?;
    Ok(config)
}

fn parse_bool(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            field,
            "not_a_boolean",
            Some(value.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WriteMode;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn overrides_replace_document_values() -> anyhow::Result<()> {
        let config = apply_env_overrides(
            WriterConfig::default(),
            lookup_from(&[
                (ENV_DIRECTORY, "/var/out"),
                (ENV_MODE, "overwrite"),
                (ENV_CREATE_DIR, "yes"),
                (ENV_APPEND_NEWLINE, "off"),
                (ENV_ENCODING, "gbk"),
                (ENV_CLEAR_PAYLOAD, "1"),
                (ENV_FILE_TYPE, ".jpg"),
                (ENV_UTC_OFFSET, "-60"),
            ]),
        )?;
        assert_eq!(config.directory, Some(PathBuf::from("/var/out")));
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert!(config.create_dir);
        assert!(!config.append_newline);
        assert_eq!(config.encoding_label(), Some("gbk"));
        assert!(config.clear_payload);
        assert_eq!(config.file_type, "jpg");
        assert_eq!(config.utc_offset_minutes, -60);
        Ok(())
    }

    #[test]
    fn blank_directory_override_selects_dynamic_mode() -> anyhow::Result<()> {
        let base = WriterConfig {
            directory: Some(PathBuf::from("/fixed")),
            ..WriterConfig::default()
        };
        let config = apply_env_overrides(base, lookup_from(&[(ENV_DIRECTORY, " ")]))?;
        assert!(config.is_dynamic());
        Ok(())
    }

    #[test]
    fn malformed_overrides_report_field() {
        let err = apply_env_overrides(
            WriterConfig::default(),
            lookup_from(&[(ENV_CREATE_DIR, "maybe")]),
        );
        assert!(matches!(
            err,
            Err(ConfigError::InvalidField {
                field: "create_dir",
                reason: "not_a_boolean",
                ..
            })
        ));

        let err = apply_env_overrides(
            WriterConfig::default(),
            lookup_from(&[(ENV_UTC_OFFSET, "eight")]),
        );
        assert!(matches!(
            err,
            Err(ConfigError::InvalidField {
                field: "utc_offset_minutes",
                ..
            })
        ));
    }

    #[test]
    fn load_with_reads_document_then_validates() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-config-")?;
        let path = temp.path().join("writer.json");
        fs::write(&path, r#"{ "directory": "/srv/photos", "file_type": "png" }"#)?;
        let path_value = path.display().to_string();

        let config = load_with(lookup_from(&[
            (ENV_CONFIG_PATH, path_value.as_str()),
            (ENV_MODE, "append"),
        ]))?;
        assert_eq!(config.directory, Some(PathBuf::from("/srv/photos")));
        assert_eq!(config.file_type, "png");

        let invalid = load_with(lookup_from(&[
            (ENV_CONFIG_PATH, path_value.as_str()),
            (ENV_ENCODING, "not-a-charset"),
        ]));
        assert!(invalid.is_err());
        Ok(())
    }

    #[test]
    fn load_from_path_distinguishes_io_and_parse_failures() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-config-")?;
        let missing = temp.path().join("missing.json");
        assert!(matches!(
            load_from_path(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ not json")?;
        assert!(matches!(
            load_from_path(&broken),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }
}
