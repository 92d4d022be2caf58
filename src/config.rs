use crate::{body::DEFAULT_SEGMENT_SIZE, error::ConfigError, limits::Limits};

/// Top-level decoder configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Accept bare LF wherever the framing requires CRLF.
    pub lenient_line_endings: bool,
    /// Maximum size in bytes of one segment retained by a clone tee.
    pub segment_size: usize,
    /// Size and count limits.
    pub limits: Limits,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            lenient_line_endings: false,
            segment_size: DEFAULT_SEGMENT_SIZE,
            limits: Limits::default(),
        }
    }
}

impl DecoderConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_size == 0 {
            return Err(ConfigError::InvalidSegmentSize);
        }

        self.limits.validate()
    }
}
