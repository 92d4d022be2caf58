//! Body handles, readers and the clone tee.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::SourceError;

/// Capability-typed body handle and its single-use reader.
pub mod handle;
/// Shared segment arena backing cloned handles.
pub mod tee;

pub use handle::{Body, BodyHandle, BodyReader, BodyState};
pub use tee::{TeeStats, DEFAULT_SEGMENT_SIZE};

/// Boxed upstream byte source.
pub type BoxByteSource = Pin<Box<dyn Stream<Item = Result<Bytes, SourceError>> + Send + 'static>>;

/// Pull-based, possibly-suspending source of body chunks from one physical origin.
///
/// Implemented for every `Send + 'static` stream of `Result<Bytes, SourceError>`.
pub trait ByteSource: Stream<Item = Result<Bytes, SourceError>> + Send + 'static {}

impl<T> ByteSource for T where T: Stream<Item = Result<Bytes, SourceError>> + Send + 'static {}
