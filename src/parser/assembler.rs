use bytes::BytesMut;

use crate::{
    error::{DecodeError, ErrorKind},
    limits::Limits,
    parser::{
        headers::{parse_header_block, parse_part_headers, PartHeaders},
        scanner::ScanEvent,
    },
    part::Part,
};

/// Decoding progress of one multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Skipping preamble bytes before the first delimiter.
    AwaitingPreamble,
    /// Collecting a part header block.
    ReadingHeaders,
    /// Collecting a part body.
    ReadingBody,
    /// The terminal marker was seen; the last part is being handed out.
    AwaitingFinal,
    /// Every part was produced.
    Done,
    /// Decoding failed; terminal.
    Errored(ErrorKind),
}

#[derive(Debug)]
enum Stage {
    Preamble,
    Headers { raw: BytesMut, lines: LineCursor },
    Body { headers: PartHeaders, body: BytesMut },
    Final,
}

/// Builds parts from scanner events, one at a time.
#[derive(Debug)]
pub struct PartAssembler {
    stage: Stage,
    lenient: bool,
    limits: Limits,
    parts: usize,
}

impl PartAssembler {
    /// Creates an assembler waiting for the opening delimiter.
    pub fn new(lenient: bool, limits: Limits) -> Self {
        Self {
            stage: Stage::Preamble,
            lenient,
            limits,
            parts: 0,
        }
    }

    /// Current parse state.
    pub fn state(&self) -> ParseState {
        match self.stage {
            Stage::Preamble => ParseState::AwaitingPreamble,
            Stage::Headers { .. } => ParseState::ReadingHeaders,
            Stage::Body { .. } => ParseState::ReadingBody,
            Stage::Final => ParseState::AwaitingFinal,
        }
    }

    /// Number of parts completed so far.
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Feeds one scanner event, returning a part when a delimiter completes one.
    pub fn push_event(&mut self, event: ScanEvent) -> Result<Option<Part>, DecodeError> {
        match event {
            ScanEvent::Literal(bytes) => {
                self.push_literal(&bytes)?;
                Ok(None)
            }
            ScanEvent::BoundaryFound { is_final } => self.push_boundary(is_final),
        }
    }

    /// Refines an end-of-input scanner error with what was being assembled.
    pub fn end_of_input_error(&self, err: DecodeError) -> DecodeError {
        match (&self.stage, err) {
            (Stage::Headers { raw, .. }, DecodeError::MissingFinalBoundary) if !raw.is_empty() => {
                DecodeError::UnexpectedEndOfStream
            }
            (_, err) => err,
        }
    }

    fn push_literal(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        match &mut self.stage {
            Stage::Preamble | Stage::Final => Ok(()),
            Stage::Headers { raw, .. } => {
                raw.extend_from_slice(bytes);
                self.try_finish_headers()
            }
            Stage::Body { body, .. } => {
                body.extend_from_slice(bytes);
                self.limits.check_part(body.len())
            }
        }
    }

    fn push_boundary(&mut self, is_final: bool) -> Result<Option<Part>, DecodeError> {
        // The delimiter's leading CRLF may double as the blank line ending an
        // empty-bodied part's header block.
        if let Stage::Headers { raw, .. } = &mut self.stage {
            raw.extend_from_slice(b"\r\n");
            self.try_finish_headers()?;
            if matches!(self.stage, Stage::Headers { .. }) {
                return Err(DecodeError::header(
                    "part header block is not terminated by a blank line",
                ));
            }
        }

        let next = if is_final {
            Stage::Final
        } else {
            Stage::Headers {
                raw: BytesMut::new(),
                lines: LineCursor::default(),
            }
        };

        match std::mem::replace(&mut self.stage, next) {
            Stage::Body { headers, body } => {
                self.parts += 1;
                self.limits.check_parts(self.parts)?;
                Ok(Some(Part::new(headers, body.freeze())))
            }
            Stage::Preamble | Stage::Final | Stage::Headers { .. } => Ok(None),
        }
    }

    fn try_finish_headers(&mut self) -> Result<(), DecodeError> {
        let Stage::Headers { raw, lines } = &mut self.stage else {
            return Ok(());
        };

        let Some((block_len, consumed)) = find_blank_line(raw, lines, self.lenient)? else {
            return self.limits.check_header(raw.len());
        };
        self.limits.check_header(block_len)?;

        let block = raw.split_to(consumed);
        let headers = parse_part_headers(parse_header_block(&block[..block_len], self.lenient)?)?;
        let body = std::mem::take(raw);
        self.limits.check_part(body.len())?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            field = headers.name.as_str(),
            file_name = headers.filename.as_deref().unwrap_or("<none>"),
            "assembler: part headers parsed"
        );

        self.stage = Stage::Body { headers, body };
        Ok(())
    }
}

// Progress of the blank-line search over a growing header buffer.
#[derive(Debug, Clone, Copy, Default)]
struct LineCursor {
    line_start: usize,
    searched: usize,
}

// Returns the header block length and the bytes consumed through the blank line.
// Bytes already searched are not scanned again.
fn find_blank_line(
    raw: &[u8],
    lines: &mut LineCursor,
    lenient: bool,
) -> Result<Option<(usize, usize)>, DecodeError> {
    while let Some(offset) = raw[lines.searched..].iter().position(|byte| *byte == b'\n') {
        let newline = lines.searched + offset;
        let line_start = lines.line_start;
        let has_cr = newline > line_start && raw[newline - 1] == b'\r';
        if !has_cr && !lenient {
            return Err(DecodeError::header("header line must end with CRLF"));
        }

        let content_end = if has_cr { newline - 1 } else { newline };
        if content_end == line_start {
            return Ok(Some((line_start, newline + 1)));
        }
        lines.line_start = newline + 1;
        lines.searched = newline + 1;
    }

    lines.searched = raw.len();
    Ok(None)
}
