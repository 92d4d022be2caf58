use bytes::{Buf, Bytes, BytesMut};

use crate::{error::DecodeError, parser::boundary::Boundary};

// Whitespace tolerated between a boundary token and its line break.
const MAX_TRANSPORT_PADDING: usize = 64;

/// Event produced by [`BoundaryScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Bytes conclusively known not to belong to a delimiter.
    Literal(Bytes),
    /// A complete delimiter; `is_final` when it was the `--boundary--` marker.
    BoundaryFound {
        /// Whether this delimiter terminates the multipart body.
        is_final: bool,
    },
}

/// Outcome of one [`BoundaryScanner::next_event`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// The next event.
    Event(ScanEvent),
    /// Nothing can be classified until more input is pushed.
    NeedMore,
    /// The final delimiter was emitted; any remaining input is epilogue.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    Incomplete,
    NotDelimiter,
    Continue(usize),
    Final,
}

/// Incremental, sans-io delimiter search over pushed chunks.
///
/// The input is treated as if preceded by a CRLF, so the opening delimiter
/// may start at the first byte. Any tail that may still turn into a
/// delimiter is held back until more input arrives or
/// [`end_of_input`](Self::end_of_input) is signalled.
#[derive(Debug)]
pub struct BoundaryScanner {
    // "\n--" + boundary; a preceding '\r' is required unless lenient.
    needle: Vec<u8>,
    boundary_len: usize,
    lenient: bool,
    buffer: BytesMut,
    pending: Option<ScanEvent>,
    end_of_input: bool,
    input_seen: bool,
    delimiters_seen: usize,
    finished: bool,
}

impl BoundaryScanner {
    /// Creates a scanner for `boundary`; `lenient` also accepts bare LF line breaks.
    pub fn new(boundary: &Boundary, lenient: bool) -> Self {
        let mut needle = Vec::with_capacity(boundary.len() + 3);
        needle.extend_from_slice(b"\n--");
        needle.extend_from_slice(boundary.as_bytes());

        let mut buffer = BytesMut::with_capacity(boundary.len() + 8);
        buffer.extend_from_slice(b"\r\n");

        Self {
            needle,
            boundary_len: boundary.len(),
            lenient,
            buffer,
            pending: None,
            end_of_input: false,
            input_seen: false,
            delimiters_seen: 0,
            finished: false,
        }
    }

    /// Size of the lookback window carried across chunk boundaries.
    pub fn lookback(&self) -> usize {
        self.boundary_len + 4
    }

    /// Number of input bytes currently held back.
    pub fn held(&self) -> usize {
        self.buffer.len()
    }

    /// Number of delimiters found so far.
    pub fn delimiters_seen(&self) -> usize {
        self.delimiters_seen
    }

    /// Appends the next input chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.finished || chunk.is_empty() {
            return;
        }
        self.input_seen = true;
        self.buffer.extend_from_slice(chunk);
    }

    /// Signals that no further input will be pushed.
    pub fn end_of_input(&mut self) {
        self.end_of_input = true;
    }

    /// Returns the next event, or why none is available.
    pub fn next_event(&mut self) -> Result<Scan, DecodeError> {
        if let Some(event) = self.pending.take() {
            return Ok(Scan::Event(event));
        }

        if self.finished {
            return Ok(Scan::Done);
        }

        let mut from = 0;
        while let Some((start, after)) = self.find_candidate(from) {
            match self.classify(after) {
                Suffix::NotDelimiter => from = after,
                Suffix::Incomplete => {
                    if start > 0 {
                        return Ok(self.release(start));
                    }
                    if self.end_of_input {
                        return Err(DecodeError::TruncatedBoundary);
                    }
                    return Ok(Scan::NeedMore);
                }
                Suffix::Continue(len) => return Ok(self.delimiter(start, after + len, false)),
                Suffix::Final => return Ok(self.delimiter(start, after + 2, true)),
            }
        }

        let safe = self.buffer.len() - self.partial_tail(from);
        if safe > 0 {
            return Ok(self.release(safe));
        }

        if !self.end_of_input {
            return Ok(Scan::NeedMore);
        }

        Err(self.end_error())
    }

    // Finds the next "\n--boundary" at or after `from`, returning the
    // delimiter start (including a preceding '\r') and the index past the token.
    fn find_candidate(&self, mut from: usize) -> Option<(usize, usize)> {
        while let Some(offset) = find_subslice(self.buffer.get(from..)?, &self.needle) {
            let at = from + offset;
            let after = at + self.needle.len();
            if at > 0 && self.buffer[at - 1] == b'\r' {
                return Some((at - 1, after));
            }
            if self.lenient {
                return Some((at, after));
            }
            from = at + 1;
        }
        None
    }

    fn classify(&self, after: usize) -> Suffix {
        let rest = &self.buffer[after..];

        match rest {
            [] | [b'-'] => return Suffix::Incomplete,
            [b'-', b'-', ..] => return Suffix::Final,
            [b'-', ..] => return Suffix::NotDelimiter,
            _ => {}
        }

        let padding = rest
            .iter()
            .take_while(|byte| matches!(byte, b' ' | b'\t'))
            .count();
        if padding > MAX_TRANSPORT_PADDING {
            return Suffix::NotDelimiter;
        }

        match &rest[padding..] {
            [] | [b'\r'] => Suffix::Incomplete,
            [b'\r', b'\n', ..] => Suffix::Continue(padding + 2),
            [b'\n', ..] if self.lenient => Suffix::Continue(padding + 1),
            _ => Suffix::NotDelimiter,
        }
    }

    // Longest suffix of `buffer[from..]` that could still grow into a delimiter.
    fn partial_tail(&self, from: usize) -> usize {
        let region = &self.buffer[from..];
        let longest = self.needle.len().min(region.len());

        for len in (1..=longest).rev() {
            let tail = &region[region.len() - len..];
            let is_prefix = match tail.split_first() {
                Some((b'\r', rest)) => self.needle.starts_with(rest),
                _ => self.lenient && self.needle.starts_with(tail),
            };
            if is_prefix {
                return len;
            }
        }

        0
    }

    fn release(&mut self, len: usize) -> Scan {
        Scan::Event(ScanEvent::Literal(self.buffer.split_to(len).freeze()))
    }

    fn delimiter(&mut self, start: usize, end: usize, is_final: bool) -> Scan {
        let literal = (start > 0).then(|| self.buffer.split_to(start).freeze());
        self.buffer.advance(end - start);
        self.delimiters_seen += 1;

        if is_final {
            self.finished = true;
            self.buffer.clear();
        }

        let found = ScanEvent::BoundaryFound { is_final };
        match literal {
            Some(bytes) => {
                self.pending = Some(found);
                Scan::Event(ScanEvent::Literal(bytes))
            }
            None => Scan::Event(found),
        }
    }

    fn end_error(&self) -> DecodeError {
        let mut tail: &[u8] = &self.buffer;
        if let Some(rest) = tail.strip_prefix(b"\r") {
            tail = rest;
        }
        if let Some(rest) = tail.strip_prefix(b"\n--") {
            if !rest.is_empty() {
                return DecodeError::TruncatedBoundary;
            }
        }

        if self.delimiters_seen == 0 && self.input_seen {
            DecodeError::BoundaryMismatch
        } else {
            DecodeError::MissingFinalBoundary
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
