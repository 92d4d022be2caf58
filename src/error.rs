use thiserror::Error;

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
    /// A per-part limit exceeded the configured body limit.
    #[error("limit `{limit}` ({value}) cannot exceed `max_body_size` ({max_body_size})")]
    LimitExceedsBodySize {
        /// Name of the limit that exceeded `max_body_size`.
        limit: &'static str,
        /// Configured value of `limit`.
        value: u64,
        /// Configured `max_body_size`.
        max_body_size: u64,
    },
    /// The tee segment size must be strictly greater than zero.
    #[error("segment size must be greater than 0")]
    InvalidSegmentSize,
}

/// Failure reported by an upstream byte source.
///
/// Cloneable so a single upstream failure can be delivered to every reader of a tee.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Generic source failure with message context.
    #[error("{message}")]
    Message {
        /// Source failure message.
        message: String,
    },
}

impl SourceError {
    /// Creates a source error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("body read failed: {err}"))
    }
}

/// Stable discriminant of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The `Content-Type` header or boundary token is unusable.
    InvalidBoundaryHeader,
    /// The stream ended without a terminal `--boundary--` marker.
    MissingFinalBoundary,
    /// The stream ended in the middle of a delimiter.
    TruncatedBoundary,
    /// A part header block is malformed.
    HeaderParseError,
    /// A part has no `name` parameter.
    MissingFieldName,
    /// The stream ended inside a part header block.
    UnexpectedEndOfStream,
    /// A handle was read a second time.
    DoubleConsumption,
    /// A handle was cloned after reading started.
    LateCloneError,
    /// A configured limit was exceeded.
    LimitExceeded,
    /// A part body read as text is not UTF-8.
    InvalidUtf8,
    /// The upstream byte source failed.
    Source,
}

/// Runtime error type produced while cloning or decoding a body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The boundary header is absent, empty, too long or otherwise invalid.
    #[error("invalid multipart boundary header: {reason}")]
    InvalidBoundaryHeader {
        /// Why the header was rejected.
        reason: String,
    },
    /// Input ended after at least one delimiter but before the terminal marker.
    #[error("multipart body is missing its final boundary")]
    MissingFinalBoundary,
    /// Input ended part-way through a delimiter.
    #[error("multipart body ended inside a truncated boundary")]
    TruncatedBoundary,
    /// The declared boundary never appeared in a non-empty body.
    ///
    /// Reported with [`ErrorKind::MissingFinalBoundary`].
    #[error("multipart body is missing its final boundary (declared boundary never found)")]
    BoundaryMismatch,
    /// A part header block could not be parsed.
    #[error("invalid part headers: {message}")]
    HeaderParse {
        /// Parser failure message.
        message: String,
    },
    /// A part's `Content-Disposition` carries no usable `name`.
    #[error("part `Content-Disposition` is missing a non-empty `name`")]
    MissingFieldName,
    /// Input ended inside a part header block.
    #[error("multipart body ended unexpectedly inside part headers")]
    UnexpectedEndOfStream,
    /// The handle's reader was already taken.
    #[error("body has already been consumed")]
    DoubleConsumption,
    /// A clone was requested after the handle started being read.
    #[error("body cannot be cloned after reading has started")]
    LateClone,
    /// A configured limit was exceeded.
    #[error("multipart limit `{limit}` of {max} exceeded")]
    LimitExceeded {
        /// Name of the exceeded limit.
        limit: &'static str,
        /// Configured maximum.
        max: u64,
    },
    /// A part body read as text is not UTF-8.
    #[error("part `{field}` body is not valid UTF-8")]
    InvalidUtf8 {
        /// Field name of the part.
        field: String,
    },
    /// The upstream byte source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl DecodeError {
    /// Creates a header parse error from a message.
    pub fn header(message: impl Into<String>) -> Self {
        Self::HeaderParse {
            message: message.into(),
        }
    }

    /// Creates an invalid-boundary error from a reason.
    pub fn boundary(reason: impl Into<String>) -> Self {
        Self::InvalidBoundaryHeader {
            reason: reason.into(),
        }
    }

    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBoundaryHeader { .. } => ErrorKind::InvalidBoundaryHeader,
            Self::MissingFinalBoundary | Self::BoundaryMismatch => ErrorKind::MissingFinalBoundary,
            Self::TruncatedBoundary => ErrorKind::TruncatedBoundary,
            Self::HeaderParse { .. } => ErrorKind::HeaderParseError,
            Self::MissingFieldName => ErrorKind::MissingFieldName,
            Self::UnexpectedEndOfStream => ErrorKind::UnexpectedEndOfStream,
            Self::DoubleConsumption => ErrorKind::DoubleConsumption,
            Self::LateClone => ErrorKind::LateCloneError,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::InvalidUtf8 { .. } => ErrorKind::InvalidUtf8,
            Self::Source(_) => ErrorKind::Source,
        }
    }

    /// Returns `true` when the failure is attributable to the submitted payload.
    ///
    /// Handle misuse and upstream faults return `false`.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::DoubleConsumption | ErrorKind::LateCloneError | ErrorKind::Source
        )
    }
}
