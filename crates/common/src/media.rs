//! Inline image handling
//!
//! Attachments travel as `data:` URLs. Older exports stored bare base64
//! payloads; their media type is recovered from the first encoded bytes.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix of every attachment already in embeddable form
pub const DATA_IMAGE_PREFIX: &str = "data:image";

/// Prefix of any promoted attachment, whatever its media type
pub const DATA_URL_PREFIX: &str = "data:";

/// One magic-number rule: base64 text prefix → media type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicPrefix {
    pub prefix: String,
    pub media_type: String,
}

/// Ordered sniffing rules plus the fallback for unmatched payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaTypeTable {
    /// Media type for payloads no rule matches
    pub fallback: String,
    pub rules: Vec<MagicPrefix>,
}

impl Default for MediaTypeTable {
    fn default() -> Self {
        let rule = |prefix: &str, media_type: &str| MagicPrefix {
            prefix: prefix.to_string(),
            media_type: media_type.to_string(),
        };
        Self {
            fallback: "image/png".to_string(),
            rules: vec![
                rule("/9j/", "image/jpeg"),
                rule("iVBORw0KGgo", "image/png"),
                rule("R0lGODlh", "image/gif"),
            ],
        }
    }
}

impl MediaTypeTable {
    /// Media type for a bare base64 payload
    pub fn sniff(&self, payload: &str) -> &str {
        self.rules
            .iter()
            .find(|r| payload.starts_with(&r.prefix))
            .map(|r| r.media_type.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Promote a bare payload to a data URL. Existing data URLs are returned
    /// unchanged, so applying this twice is the same as applying it once.
    pub fn ensure_data_url(&self, value: &str) -> String {
        if value.starts_with(DATA_URL_PREFIX) {
            return value.to_string();
        }
        format!("data:{};base64,{}", self.sniff(value), value)
    }
}

/// A parsed `data:<type>;base64,<payload>` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub media_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    pub fn parse(url: &'a str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("attachment is not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("data URL has no payload".to_string()))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidInput(format!("unsupported data URL encoding '{}'", header)))?;
        Ok(Self { media_type, payload })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid base64 payload: {}", e)))
    }

    /// File extension matching the media type
    pub fn extension(&self) -> &'static str {
        match self.media_type {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}
