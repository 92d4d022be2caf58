use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use http::HeaderMap;

use crate::{parser::headers::PartHeaders, DecodeError};

/// One decoded multipart part.
///
/// The body accessors [`bytes`](Self::bytes), [`text`](Self::text) and
/// [`stream`](Self::stream) are single-pass; [`body`](Self::body) is a
/// non-consuming view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    headers: PartHeaders,
    body: Bytes,
    consumed: bool,
}

impl Part {
    pub(crate) fn new(headers: PartHeaders, body: Bytes) -> Self {
        Self {
            headers,
            body,
            consumed: false,
        }
    }

    /// Field name from `Content-Disposition`.
    pub fn name(&self) -> &str {
        &self.headers.name
    }

    /// File name from `Content-Disposition`, for file parts.
    pub fn filename(&self) -> Option<&str> {
        self.headers.filename.as_deref()
    }

    /// Declared part content type.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.headers.content_type.as_ref()
    }

    /// Declared content type, or `text/plain` when absent (RFC 7578 §4.4).
    pub fn effective_content_type(&self) -> mime::Mime {
        self.headers
            .content_type
            .clone()
            .unwrap_or(mime::TEXT_PLAIN)
    }

    /// Returns `true` when the part carries a file name.
    pub fn is_file(&self) -> bool {
        self.headers.filename.is_some()
    }

    /// All header lines of the part.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers.raw
    }

    /// Parsed header model.
    pub fn parsed_headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Non-consuming view of the body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns `true` when the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Reads the full part body.
    pub async fn bytes(&mut self) -> Result<Bytes, DecodeError> {
        self.take_body()
    }

    /// Reads the full part body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, DecodeError> {
        let bytes = self.take_body()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 {
            field: self.headers.name.clone(),
        })
    }

    /// Returns a one-shot body stream.
    pub fn stream(&mut self) -> Result<PartBodyStream, DecodeError> {
        Ok(PartBodyStream {
            body: Some(self.take_body()?),
        })
    }

    /// Consumes the part, returning its header model and body.
    pub fn into_parts(self) -> (PartHeaders, Bytes) {
        (self.headers, self.body)
    }

    fn take_body(&mut self) -> Result<Bytes, DecodeError> {
        if self.consumed {
            return Err(DecodeError::DoubleConsumption);
        }

        self.consumed = true;
        Ok(self.body.clone())
    }
}

/// One-shot stream returned by [`Part::stream`].
#[derive(Debug)]
pub struct PartBodyStream {
    body: Option<Bytes>,
}

impl Stream for PartBodyStream {
    type Item = Result<Bytes, DecodeError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.body.take().map(Ok))
    }
}
