//! Payload normalisation into the bytes written to disk.
//!
//! # Design
//! - Bytes pass through untouched: no line terminator, no re-encoding.
//! - Everything else is rendered to text, optionally terminated, then encoded.

use encoding_rs::Encoding;
use serde_json::Value;
use stampfile_config::{ConfigError, WriterConfig};

use crate::model::Payload;

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Converts payloads to bytes according to the writer configuration.
#[derive(Debug, Clone, Copy)]
pub struct PayloadEncoder {
    append_newline: bool,
    encoding: Option<&'static Encoding>,
}

impl PayloadEncoder {
    /// Encoder honouring the newline and encoding settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the encoding label is unknown.
    pub fn from_config(config: &WriterConfig) -> Result<Self, ConfigError> {
        let encoding = match config.encoding_label() {
            Some(label) => Some(Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                ConfigError::InvalidField {
                    field: "encoding",
                    reason: "unknown_encoding",
                    value: Some(label.to_string()),
                }
            })?),
            None => None,
        };
        Ok(Self {
            append_newline: config.append_newline,
            encoding,
        })
    }

    /// Render `payload` to the bytes that will be written.
    ///
    /// Encodings without an encoder of their own (UTF-16 variants) produce
    /// UTF-8, and unmappable characters become numeric character references.
    #[must_use]
    pub fn encode(&self, payload: &Payload) -> Vec<u8> {
        let mut text = match payload {
            Payload::Bytes(bytes) => return bytes.clone(),
            Payload::Text(text) | Payload::Json(Value::String(text)) => text.clone(),
            Payload::Json(value) => value.to_string(),
        };
        if self.append_newline {
            text.push_str(LINE_ENDING);
        }
        match self.encoding {
            Some(encoding) => encoding.encode(&text).0.into_owned(),
            None => text.into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoder(append_newline: bool, encoding: &str) -> PayloadEncoder {
        let config = WriterConfig {
            append_newline,
            encoding: encoding.to_string(),
            ..WriterConfig::default()
        };
        match PayloadEncoder::from_config(&config) {
            Ok(encoder) => encoder,
            Err(err) => panic!("encoder construction failed: {err}"),
        }
    }

    #[test]
    fn structured_values_render_as_compact_json() {
        let plain = encoder(false, "none");
        assert_eq!(plain.encode(&Payload::Json(json!({"x": 1}))), br#"{"x":1}"#);
        assert_eq!(plain.encode(&Payload::Json(json!(true))), b"true");
        assert_eq!(plain.encode(&Payload::Json(json!(2.5))), b"2.5");
        assert_eq!(plain.encode(&Payload::Json(json!("text"))), b"text");
    }

    #[test]
    fn newline_is_appended_to_text_but_not_bytes() {
        let newline = encoder(true, "none");
        let expected = format!("a{LINE_ENDING}");
        assert_eq!(newline.encode(&Payload::from("a")), expected.as_bytes());
        assert_eq!(newline.encode(&Payload::Bytes(vec![1, 2])), vec![1, 2]);
    }

    #[test]
    fn named_encoding_is_applied() {
        let gbk = encoder(false, "gbk");
        assert_eq!(gbk.encode(&Payload::from("中")), vec![0xD6, 0xD0]);
        let latin1 = encoder(false, "latin1");
        assert_eq!(latin1.encode(&Payload::from("é")), vec![0xE9]);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let config = WriterConfig {
            encoding: "no-such-charset".to_string(),
            ..WriterConfig::default()
        };
        assert!(PayloadEncoder::from_config(&config).is_err());
    }
}
