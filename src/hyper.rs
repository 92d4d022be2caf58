//! Hyper integration helpers.

use std::fmt;

use ::hyper::{body::Body as HttpBody, header, Request};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::BodyExt;

use crate::{Body, BodyHandle, Boundary, DecodeError, Multipart, MultipartDecoder, SourceError};

/// Extracts the raw `Content-Type` header from a request.
pub fn content_type_from_request<B>(request: &Request<B>) -> Result<&str, DecodeError> {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| DecodeError::boundary("missing Content-Type header"))?
        .to_str()
        .map_err(|_| DecodeError::boundary("Content-Type header must be ASCII"))
}

/// Wraps any Hyper body into a [`BodyHandle`].
pub fn body_handle_from_body<B>(body: B) -> BodyHandle
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: fmt::Display,
{
    BodyHandle::new(body.into_data_stream().map(|item| {
        item.map_err(|err| SourceError::new(format!("hyper body stream error: {err}")))
    }))
}

/// Replaces a request's body with a [`BodyHandle`] so wrapping layers can
/// clone it before anything reads it.
pub fn into_handle_request<B>(request: Request<B>) -> Request<BodyHandle>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: fmt::Display,
{
    request.map(body_handle_from_body)
}

/// Starts decoding a request whose body is any [`Body`] capability.
///
/// The `Content-Type` header is validated before the body is touched.
pub fn decode_request<B>(
    decoder: &MultipartDecoder,
    request: &Request<B>,
) -> Result<Multipart, DecodeError>
where
    B: Body,
{
    let boundary = Boundary::from_content_type(content_type_from_request(request)?)?;
    decoder.decode_with_boundary(request.body(), &boundary)
}
