//! Codec/container identifiers

use std::fmt;

/// A four-character codec code paired with the container file extension.
///
/// Both values are passed through opaquely; only the encoder layer decides
/// whether the pair actually works.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecChoice {
    /// Four-character codec code, e.g. `mp4v`
    pub fourcc: String,
    /// Container extension without the leading dot, e.g. `mp4`
    pub extension: String,
}

impl CodecChoice {
    pub fn new(fourcc: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            fourcc: fourcc.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }
}

impl Default for CodecChoice {
    fn default() -> Self {
        Self::new("mp4v", "mp4")
    }
}

impl fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/.{}", self.fourcc, self.extension)
    }
}

/// A fallback codec proposed when a requested pair fails probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSuggestion {
    pub codec: String,
    pub extension: String,
    pub description: String,
    /// Whether this pair passed a probe on the current machine
    pub verified: bool,
}

impl CodecSuggestion {
    pub fn new(codec: &str, extension: &str, description: &str, verified: bool) -> Self {
        Self {
            codec: codec.to_string(),
            extension: extension.to_string(),
            description: description.to_string(),
            verified,
        }
    }

    pub fn choice(&self) -> CodecChoice {
        CodecChoice::new(self.codec.clone(), self.extension.clone())
    }
}
