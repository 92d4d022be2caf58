use crate::{config::DecoderConfig, error::ConfigError, limits::Limits, MultipartDecoder};

/// Builder for configuring a [`MultipartDecoder`].
#[derive(Debug, Clone, Default)]
pub struct DecoderBuilder {
    config: DecoderConfig,
}

impl DecoderBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Accepts bare LF line breaks in delimiters and header blocks.
    pub fn lenient_line_endings(mut self, lenient: bool) -> Self {
        self.config.lenient_line_endings = lenient;
        self
    }

    /// Sets the tee segment size used by handles created through the decoder.
    pub fn segment_size(mut self, segment_size: usize) -> Self {
        self.config.segment_size = segment_size;
        self
    }

    /// Sets decode limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build_config(self) -> Result<DecoderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Builds a decoder from validated configuration.
    pub fn build(self) -> Result<MultipartDecoder, ConfigError> {
        MultipartDecoder::with_config(self.config)
    }
}
