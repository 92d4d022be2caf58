/// Part assembly state machine.
pub mod assembler;
/// Multipart boundary extraction and validation.
pub mod boundary;
/// Part header parsing.
pub mod headers;
/// Incremental delimiter scanner.
pub mod scanner;

mod percent;

pub use assembler::{ParseState, PartAssembler};
pub use boundary::{extract_multipart_boundary, Boundary, MAX_BOUNDARY_LEN};
pub use headers::{
    parse_content_disposition, parse_header_block, parse_part_content_type, parse_part_headers,
    ContentDisposition, PartHeaders,
};
pub use scanner::{BoundaryScanner, Scan, ScanEvent};
