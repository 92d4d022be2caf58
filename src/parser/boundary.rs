use std::fmt;

use crate::{error::DecodeError, parser::percent};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";
/// Longest boundary token permitted by RFC 2046.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Validated multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Validates a raw boundary token.
    pub fn new(token: impl Into<String>) -> Result<Self, DecodeError> {
        let token = token.into();
        validate_boundary(&token)?;
        Ok(Self(token))
    }

    /// Extracts the boundary from a `multipart/form-data` `Content-Type` value.
    pub fn from_content_type(content_type: &str) -> Result<Self, DecodeError> {
        extract_multipart_boundary(content_type)
    }

    /// Returns the boundary token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the boundary token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the token length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an empty boundary never validates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts and validates the `boundary` parameter from a `Content-Type` value.
pub fn extract_multipart_boundary(content_type: &str) -> Result<Boundary, DecodeError> {
    let mime = content_type
        .parse::<mime::Mime>()
        .map_err(|_| DecodeError::boundary("invalid Content-Type header"))?;

    if mime.essence_str() != MULTIPART_FORM_DATA {
        return Err(DecodeError::boundary("Content-Type must be multipart/form-data"));
    }

    let raw = mime
        .get_param("boundary")
        .map(|value| value.as_str())
        .ok_or_else(|| DecodeError::boundary("missing boundary parameter"))?;

    let token = if raw.as_bytes().contains(&b'%') {
        percent::decode_utf8(raw).map_err(|err| DecodeError::boundary(format!("boundary {err}")))?
    } else {
        raw.to_owned()
    };

    Boundary::new(token)
}

fn validate_boundary(boundary: &str) -> Result<(), DecodeError> {
    if boundary.is_empty() {
        return Err(DecodeError::boundary("boundary cannot be empty"));
    }

    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(DecodeError::boundary(format!(
            "boundary cannot exceed {MAX_BOUNDARY_LEN} bytes"
        )));
    }

    if boundary.ends_with(' ') {
        return Err(DecodeError::boundary("boundary cannot end with a space"));
    }

    if !boundary.bytes().all(is_bchar) {
        return Err(DecodeError::boundary("boundary contains invalid characters"));
    }

    Ok(())
}

// RFC 2046 `bchars`.
fn is_bchar(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'\'' | b'(' | b')' | b'+' | b'_' | b',' | b'-' | b'.' | b'/' | b':' | b'=' | b'?' | b' '
        )
}
