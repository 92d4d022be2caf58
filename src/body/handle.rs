use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
#[cfg(feature = "tokio-rt")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-rt")]
use tokio_util::io::ReaderStream;

use super::{
    tee::{CloneTee, TeeCursor, TeeStats, DEFAULT_SEGMENT_SIZE},
    BoxByteSource, ByteSource,
};
use crate::{DecodeError, SourceError};

/// The only operations a caller may perform on a request body.
///
/// Framework layers that wrap a body should implement this by delegation
/// instead of relying on a concrete handle type; decoding behaves the same
/// however many layers sit above the handle.
pub trait Body {
    /// Produces an independent handle over the same logical body.
    ///
    /// Fails with [`DecodeError::LateClone`] once reading has started.
    fn try_clone(&self) -> Result<BodyHandle, DecodeError>;

    /// Takes the single reader of this body.
    ///
    /// Fails with [`DecodeError::DoubleConsumption`] on every call after the first.
    fn take_reader(&self) -> Result<BodyReader, DecodeError>;
}

impl<B: Body + ?Sized> Body for &B {
    fn try_clone(&self) -> Result<BodyHandle, DecodeError> {
        (**self).try_clone()
    }

    fn take_reader(&self) -> Result<BodyReader, DecodeError> {
        (**self).take_reader()
    }
}

impl<B: Body + ?Sized> Body for Box<B> {
    fn try_clone(&self) -> Result<BodyHandle, DecodeError> {
        (**self).try_clone()
    }

    fn take_reader(&self) -> Result<BodyReader, DecodeError> {
        (**self).take_reader()
    }
}

impl<B: Body + ?Sized> Body for Arc<B> {
    fn try_clone(&self) -> Result<BodyHandle, DecodeError> {
        (**self).try_clone()
    }

    fn take_reader(&self) -> Result<BodyReader, DecodeError> {
        (**self).take_reader()
    }
}

/// Consumption marker of a [`BodyHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// No reader has been taken; the handle may still be cloned.
    Unread,
    /// A reader is live.
    Reading,
    /// The reader reached the end of the body or was dropped.
    Consumed,
}

enum Origin {
    Direct(BoxByteSource),
    Tee(TeeCursor),
}

impl Origin {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, SourceError>>> {
        match self {
            Self::Direct(source) => source.as_mut().poll_next(cx),
            Self::Tee(cursor) => Pin::new(cursor).poll_next(cx),
        }
    }
}

enum SlotState {
    Unread(Origin),
    Reading,
    Consumed,
}

struct Slot {
    state: Mutex<SlotState>,
    segment_size: usize,
}

impl Slot {
    fn new(origin: Origin, segment_size: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Unread(origin)),
            segment_size,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_consumed(&self) {
        *self.lock() = SlotState::Consumed;
    }
}

/// Handle over one logical request body plus its consumption marker.
///
/// A handle is read at most once. Independent readers of the same bytes are
/// obtained with [`BodyHandle::try_clone`] before the first read.
pub struct BodyHandle {
    slot: Arc<Slot>,
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BodyHandle {
    /// Creates a handle over an upstream byte source.
    pub fn new(source: impl ByteSource) -> Self {
        Self::with_segment_size(source, DEFAULT_SEGMENT_SIZE)
    }

    /// Creates a handle whose clones retain upstream bytes in segments of at most `segment_size`.
    pub fn with_segment_size(source: impl ByteSource, segment_size: usize) -> Self {
        Self {
            slot: Slot::new(Origin::Direct(Box::pin(source)), segment_size.max(1)),
        }
    }

    /// Creates a handle over an in-memory body.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_chunks([bytes.into()])
    }

    /// Creates a handle that yields the given chunks in order.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, SourceError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(stream::iter(chunks))
    }

    /// Creates a handle over an empty body.
    pub fn empty() -> Self {
        Self::new(stream::empty::<Result<Bytes, SourceError>>())
    }

    /// Creates a handle over a tokio [`AsyncRead`], such as a socket half or a file.
    #[cfg(feature = "tokio-rt")]
    pub fn from_async_read<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::new(ReaderStream::new(reader).map(|chunk| chunk.map_err(SourceError::from)))
    }

    fn from_origin(origin: Origin, segment_size: usize) -> Self {
        Self {
            slot: Slot::new(origin, segment_size),
        }
    }

    /// Returns the current consumption marker.
    pub fn state(&self) -> BodyState {
        match &*self.slot.lock() {
            SlotState::Unread(_) => BodyState::Unread,
            SlotState::Reading => BodyState::Reading,
            SlotState::Consumed => BodyState::Consumed,
        }
    }

    /// Returns retention statistics of the shared tee, once this handle has been cloned.
    pub fn tee_stats(&self) -> Option<TeeStats> {
        match &*self.slot.lock() {
            SlotState::Unread(Origin::Tee(cursor)) => Some(cursor.stats()),
            _ => None,
        }
    }

    /// Produces an independent handle over the same logical body.
    ///
    /// The first clone moves the upstream source into a shared tee; both
    /// handles then start at offset zero. Fails with [`DecodeError::LateClone`]
    /// when the handle is already being read or consumed; a late clone never
    /// yields a partial copy.
    pub fn try_clone(&self) -> Result<Self, DecodeError> {
        let mut state = self.slot.lock();
        let origin = match std::mem::replace(&mut *state, SlotState::Reading) {
            SlotState::Unread(origin) => origin,
            other => {
                *state = other;
                return Err(DecodeError::LateClone);
            }
        };

        let (kept, forked) = match origin {
            Origin::Direct(source) => CloneTee::split(source, self.slot.segment_size),
            Origin::Tee(cursor) => {
                let forked = cursor.fork();
                (cursor, forked)
            }
        };

        *state = SlotState::Unread(Origin::Tee(kept));
        Ok(Self::from_origin(Origin::Tee(forked), self.slot.segment_size))
    }

    /// Takes the single reader of this handle.
    pub fn take_reader(&self) -> Result<BodyReader, DecodeError> {
        let mut state = self.slot.lock();
        match std::mem::replace(&mut *state, SlotState::Reading) {
            SlotState::Unread(origin) => Ok(BodyReader {
                origin: Some(origin),
                slot: Arc::clone(&self.slot),
            }),
            other => {
                *state = other;
                Err(DecodeError::DoubleConsumption)
            }
        }
    }
}

impl Body for BodyHandle {
    fn try_clone(&self) -> Result<BodyHandle, DecodeError> {
        BodyHandle::try_clone(self)
    }

    fn take_reader(&self) -> Result<BodyReader, DecodeError> {
        BodyHandle::take_reader(self)
    }
}

/// Single-use chunk stream taken from a [`BodyHandle`].
///
/// Reaching the end of the body, or dropping the reader, marks the handle
/// consumed and releases any tee registration it held.
pub struct BodyReader {
    origin: Option<Origin>,
    slot: Arc<Slot>,
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyReader")
            .field("finished", &self.origin.is_none())
            .finish_non_exhaustive()
    }
}

impl BodyReader {
    /// Returns retention statistics of the shared tee this reader draws from.
    pub fn tee_stats(&self) -> Option<TeeStats> {
        match &self.origin {
            Some(Origin::Tee(cursor)) => Some(cursor.stats()),
            _ => None,
        }
    }

    /// Collects the remaining body into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes, SourceError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }

    fn finish(&mut self) {
        self.origin = None;
        self.slot.mark_consumed();
    }
}

impl Stream for BodyReader {
    type Item = Result<Bytes, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(origin) = self.origin.as_mut() else {
            return Poll::Ready(None);
        };

        let polled = origin.poll_chunk(cx);
        if let Poll::Ready(None) = polled {
            self.finish();
        }
        polled
    }
}

impl Drop for BodyReader {
    fn drop(&mut self) {
        self.finish();
    }
}
