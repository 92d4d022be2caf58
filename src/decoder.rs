use crate::{
    body::{Body, BodyHandle, ByteSource},
    builder::DecoderBuilder,
    config::DecoderConfig,
    error::{ConfigError, DecodeError},
    multipart::Multipart,
    parser::boundary::Boundary,
    Part,
};

/// Configured entry point for decoding multipart bodies.
#[derive(Debug, Clone, Default)]
pub struct MultipartDecoder {
    config: DecoderConfig,
}

impl MultipartDecoder {
    /// Creates a decoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with explicit validated configuration.
    pub fn with_config(config: DecoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a fluent builder.
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::default()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Creates a body handle using the configured tee segment size.
    pub fn handle(&self, source: impl ByteSource) -> BodyHandle {
        BodyHandle::with_segment_size(source, self.config.segment_size)
    }

    /// Starts decoding `body` with an already extracted boundary token.
    ///
    /// The boundary is validated before the body's reader is taken, so an
    /// invalid token leaves the body unread.
    pub fn decode<B>(&self, body: &B, boundary: &str) -> Result<Multipart, DecodeError>
    where
        B: Body + ?Sized,
    {
        let boundary = Boundary::new(boundary)?;
        self.decode_with_boundary(body, &boundary)
    }

    /// Starts decoding `body` with the boundary from a `Content-Type` value.
    pub fn decode_content_type<B>(
        &self,
        body: &B,
        content_type: &str,
    ) -> Result<Multipart, DecodeError>
    where
        B: Body + ?Sized,
    {
        let boundary = Boundary::from_content_type(content_type)?;
        self.decode_with_boundary(body, &boundary)
    }

    /// Starts decoding `body` with a validated boundary.
    pub fn decode_with_boundary<B>(
        &self,
        body: &B,
        boundary: &Boundary,
    ) -> Result<Multipart, DecodeError>
    where
        B: Body + ?Sized,
    {
        let reader = body.take_reader()?;
        Ok(Multipart::new(reader, boundary, &self.config))
    }

    /// Decodes every part of `body`, or fails without returning any.
    pub async fn decode_all<B>(&self, body: &B, boundary: &str) -> Result<Vec<Part>, DecodeError>
    where
        B: Body + ?Sized,
    {
        self.decode(body, boundary)?.collect_parts().await
    }
}
