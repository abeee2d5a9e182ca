//! Codec limits

use serde::{Deserialize, Serialize};

/// Default maximum nesting depth of custom-typed fields
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum decompressed payload size on decode (1 MiB)
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Limits applied to a single encode or decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum nesting depth of custom-typed fields (the root block is depth 0)
    pub max_depth: usize,
    /// Maximum decompressed payload size in bytes, header excluded
    pub max_payload: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl CodecConfig {
    /// Builder: set the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder: set the payload limit
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Parse a config from JSON; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
