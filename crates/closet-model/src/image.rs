//! Self-contained image payloads.
//!
//! Images travel through the whole system as base64 data URLs
//! (`data:image/png;base64,iVBOR...`). They are stored inline on each
//! [`ClothingItem`](crate::ClothingItem), sent inline to the vision model and
//! decoded to raw bytes only when we need to upload or re-encode them.

use crate::error::{ClosetError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A base64 data URL holding one image.
///
/// The inner string is validated on construction, so every `ImagePayload`
/// has a mime type and a base64 body. Deserialization goes through the same
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePayload(String);

impl ImagePayload {
    /// Parse an existing data URL.
    pub fn parse(data_url: impl Into<String>) -> Result<Self> {
        let data_url = data_url.into();
        split_data_url(&data_url)?;
        Ok(Self(data_url))
    }

    /// Encode raw bytes as a data URL with the given mime type.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!(
            "{DATA_PREFIX}{mime_type}{BASE64_MARKER}{}",
            STANDARD.encode(bytes)
        ))
    }

    /// Mime type declared in the data URL (e.g. `image/png`).
    pub fn mime_type(&self) -> &str {
        // Validated in the constructors
        split_data_url(&self.0).map(|(mime, _)| mime).unwrap_or("")
    }

    /// The base64 section without the `data:` header.
    pub fn base64_data(&self) -> &str {
        split_data_url(&self.0).map(|(_, data)| data).unwrap_or("")
    }

    /// Decode the base64 body into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.base64_data())?)
    }

    /// File extension matching the mime type, used for storage keys.
    pub fn extension(&self) -> &'static str {
        match self.mime_type() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }

    /// Length of the whole data URL in bytes.
    ///
    /// This is what the vision model's input limit is measured against.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base64_data().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Split `data:<mime>;base64,<data>` into `(mime, data)`.
fn split_data_url(data_url: &str) -> Result<(&str, &str)> {
    let rest = data_url
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| ClosetError::InvalidImagePayload {
            reason: "missing `data:` prefix".to_string(),
        })?;
    let (mime, data) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| ClosetError::InvalidImagePayload {
            reason: "missing `;base64,` marker".to_string(),
        })?;
    if !mime.starts_with("image/") {
        return Err(ClosetError::InvalidImagePayload {
            reason: format!("unsupported mime type `{mime}`"),
        });
    }
    Ok((mime, data))
}

impl TryFrom<String> for ImagePayload {
    type Error = ClosetError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ImagePayload> for String {
    fn from(payload: ImagePayload) -> Self {
        payload.0
    }
}

impl fmt::Display for ImagePayload {
    // Never print whole payloads into logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} image, {} bytes>", self.mime_type(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_bytes() {
        let payload = ImagePayload::from_bytes("image/png", &[1, 2, 3, 4]);
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload.extension(), "png");
        assert_eq!(payload.decode().unwrap(), vec![1, 2, 3, 4]);
        assert!(payload.as_str().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_parse_rejects_non_data_urls() {
        assert!(ImagePayload::parse("https://example.com/a.png").is_err());
        assert!(ImagePayload::parse("data:image/png,AAAA").is_err());
        assert!(ImagePayload::parse("data:text/plain;base64,AAAA").is_err());
    }

    #[test]
    fn test_decode_reports_bad_base64() {
        let payload = ImagePayload::parse("data:image/jpeg;base64,!!!not-base64").unwrap();
        assert!(matches!(payload.decode(), Err(ClosetError::Base64(_))));
    }

    #[test]
    fn test_serde_validates() {
        let json = "\"data:image/webp;base64,AAAA\"";
        let payload: ImagePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.extension(), "webp");

        let bad: std::result::Result<ImagePayload, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display_hides_data() {
        let payload = ImagePayload::from_bytes("image/png", &[0; 32]);
        let shown = payload.to_string();
        assert!(shown.contains("image/png"));
        assert!(!shown.contains("base64"));
    }
}
