use crate::error::{ConfigError, DecodeError};

/// Default cap on one part's header block, in bytes.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Size and count limits enforced while decoding.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of body bytes read from the source.
    pub max_body_size: Option<u64>,
    /// Maximum size in bytes of a single part body.
    pub max_part_size: Option<u64>,
    /// Maximum number of parts.
    pub max_parts: Option<usize>,
    /// Maximum size in bytes of a single part header block.
    pub max_header_size: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_body_size: None,
            max_part_size: None,
            max_parts: None,
            max_header_size: Some(DEFAULT_MAX_HEADER_SIZE),
        }
    }
}

impl Limits {
    /// Creates the default limits: only the header block is bounded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates limits with no bounds at all.
    pub fn unlimited() -> Self {
        Self {
            max_header_size: None,
            ..Self::default()
        }
    }

    /// Validates that every configured limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_body_size",
            });
        }
        if self.max_part_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_part_size",
            });
        }
        if self.max_parts == Some(0) {
            return Err(ConfigError::InvalidLimitValue { limit: "max_parts" });
        }
        if self.max_header_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_header_size",
            });
        }

        if let (Some(part), Some(body)) = (self.max_part_size, self.max_body_size) {
            if part > body {
                return Err(ConfigError::LimitExceedsBodySize {
                    limit: "max_part_size",
                    value: part,
                    max_body_size: body,
                });
            }
        }

        Ok(())
    }

    pub(crate) fn check_body(&self, read: u64) -> Result<(), DecodeError> {
        check("max_body_size", read, self.max_body_size)
    }

    pub(crate) fn check_part(&self, size: usize) -> Result<(), DecodeError> {
        check("max_part_size", size as u64, self.max_part_size)
    }

    pub(crate) fn check_parts(&self, count: usize) -> Result<(), DecodeError> {
        check("max_parts", count as u64, self.max_parts.map(|max| max as u64))
    }

    pub(crate) fn check_header(&self, size: usize) -> Result<(), DecodeError> {
        check(
            "max_header_size",
            size as u64,
            self.max_header_size.map(|max| max as u64),
        )
    }
}

fn check(limit: &'static str, value: u64, max: Option<u64>) -> Result<(), DecodeError> {
    match max {
        Some(max) if value > max => {
            #[cfg(feature = "tracing")]
            tracing::debug!(limit, value, max, "limits: decode limit exceeded");

            Err(DecodeError::LimitExceeded { limit, max })
        }
        _ => Ok(()),
    }
}
