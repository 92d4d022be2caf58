use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};

use crate::{
    body::{BodyReader, TeeStats},
    config::DecoderConfig,
    limits::Limits,
    parser::{
        assembler::{ParseState, PartAssembler},
        boundary::Boundary,
        scanner::{BoundaryScanner, Scan},
    },
    DecodeError, Part,
};

/// Lazy stream of parts decoded from one body reader.
///
/// The first error ends the stream; parts yielded before it belong to a
/// submission that did not decode and should be discarded. Use
/// [`collect_parts`](Self::collect_parts) for all-or-nothing decoding.
pub struct Multipart {
    reader: Option<BodyReader>,
    scanner: BoundaryScanner,
    assembler: PartAssembler,
    limits: Limits,
    bytes_read: u64,
    outcome: Option<ParseState>,
}

impl fmt::Debug for Multipart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multipart")
            .field("state", &self.state())
            .field("bytes_read", &self.bytes_read)
            .field("parts", &self.assembler.parts())
            .finish_non_exhaustive()
    }
}

impl Multipart {
    pub(crate) fn new(reader: BodyReader, boundary: &Boundary, config: &DecoderConfig) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            boundary = boundary.as_str(),
            lenient = config.lenient_line_endings,
            "multipart: decode started"
        );

        Self {
            reader: Some(reader),
            scanner: BoundaryScanner::new(boundary, config.lenient_line_endings),
            assembler: PartAssembler::new(config.lenient_line_endings, config.limits.clone()),
            limits: config.limits.clone(),
            bytes_read: 0,
            outcome: None,
        }
    }

    /// Current parse state.
    pub fn state(&self) -> ParseState {
        self.outcome.unwrap_or_else(|| self.assembler.state())
    }

    /// Number of body bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Retention statistics of the tee this decode reads from, if any.
    pub fn tee_stats(&self) -> Option<TeeStats> {
        self.reader.as_ref().and_then(BodyReader::tee_stats)
    }

    /// Returns the next part, or `None` once the terminal marker was processed.
    pub async fn next_part(&mut self) -> Result<Option<Part>, DecodeError> {
        self.next().await.transpose()
    }

    /// Decodes every remaining part; any failure discards the parts decoded so far.
    pub async fn collect_parts(mut self) -> Result<Vec<Part>, DecodeError> {
        let mut parts = Vec::new();
        while let Some(part) = self.next_part().await? {
            parts.push(part);
        }
        Ok(parts)
    }

    fn fail(&mut self, err: DecodeError) -> Poll<Option<Result<Part, DecodeError>>> {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            error = %err,
            state = ?self.assembler.state(),
            bytes_read = self.bytes_read,
            "multipart: decode failed"
        );

        self.outcome = Some(ParseState::Errored(err.kind()));
        self.reader = None;
        Poll::Ready(Some(Err(err)))
    }

    fn complete(&mut self) -> Poll<Option<Result<Part, DecodeError>>> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            parts = self.assembler.parts(),
            bytes_read = self.bytes_read,
            "multipart: decode finished"
        );

        self.outcome = Some(ParseState::Done);
        // Epilogue bytes are never needed; release the reader now.
        self.reader = None;
        Poll::Ready(None)
    }
}

impl Stream for Multipart {
    type Item = Result<Part, DecodeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.outcome.is_some() {
            return Poll::Ready(None);
        }

        loop {
            match this.scanner.next_event() {
                Ok(Scan::Event(event)) => match this.assembler.push_event(event) {
                    Ok(Some(part)) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            field = part.name(),
                            size = part.len(),
                            "multipart: part decoded"
                        );

                        return Poll::Ready(Some(Ok(part)));
                    }
                    Ok(None) => continue,
                    Err(err) => return this.fail(err),
                },
                Ok(Scan::Done) => return this.complete(),
                Ok(Scan::NeedMore) => {}
                Err(err) => {
                    let err = this.assembler.end_of_input_error(err);
                    return this.fail(err);
                }
            }

            let Some(reader) = this.reader.as_mut() else {
                this.scanner.end_of_input();
                continue;
            };

            match Pin::new(reader).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.bytes_read += chunk.len() as u64;
                    if let Err(err) = this.limits.check_body(this.bytes_read) {
                        return this.fail(err);
                    }
                    this.scanner.push(&chunk);
                }
                Poll::Ready(Some(Err(err))) => return this.fail(err.into()),
                Poll::Ready(None) => this.scanner.end_of_input(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
