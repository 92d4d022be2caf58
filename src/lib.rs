#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Streaming `multipart/form-data` decoding over bodies that may be cloned
//! by several independent consumers before they are read.

/// Body handles, readers and the clone tee.
pub mod body;
/// Fluent builder API.
pub mod builder;
/// Decoder configuration.
pub mod config;
/// Configured decoder entry point.
pub mod decoder;
/// Error types exposed by this crate.
pub mod error;
/// Decode limits.
pub mod limits;
/// Lazy multipart part stream.
pub mod multipart;
/// Decoded part API.
pub mod part;
/// Low-level parser components.
pub mod parser;

#[cfg(feature = "hyper")]
pub mod hyper;

pub use body::{Body, BodyHandle, BodyReader, BodyState, ByteSource, TeeStats};
pub use builder::DecoderBuilder;
pub use config::DecoderConfig;
pub use decoder::MultipartDecoder;
pub use error::{ConfigError, DecodeError, ErrorKind, SourceError};
pub use limits::Limits;
pub use multipart::Multipart;
pub use parser::{extract_multipart_boundary, Boundary, ParseState};
pub use part::{Part, PartBodyStream};

/// Produces an independent handle over the same logical body as `body`.
///
/// Must be called before `body` is first read; afterwards it fails with
/// [`DecodeError::LateClone`].
pub fn clone_body<B>(body: &B) -> Result<BodyHandle, DecodeError>
where
    B: Body + ?Sized,
{
    body.try_clone()
}

/// Decodes `body` with the default configuration.
pub fn decode<B>(body: &B, boundary: &str) -> Result<Multipart, DecodeError>
where
    B: Body + ?Sized,
{
    MultipartDecoder::new().decode(body, boundary)
}
