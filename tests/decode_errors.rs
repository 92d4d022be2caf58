#![allow(missing_docs)]

use bytes::Bytes;
use formtee::{
    decode, BodyHandle, BodyState, DecodeError, ErrorKind, MultipartDecoder, ParseState,
    SourceError,
};
use futures::{stream, StreamExt};

async fn decode_err(body: &'static str, boundary: &str) -> DecodeError {
    decode(&BodyHandle::from_bytes(body), boundary)
        .expect("decode should start")
        .collect_parts()
        .await
        .expect_err("decode must fail")
}

fn assert_err_contains(err: &DecodeError, needle: &str) {
    let message = err.to_string();
    assert!(
        message.contains(needle),
        "expected `{needle}` in `{message}`"
    );
}

#[tokio::test]
async fn continuing_delimiter_at_end_is_missing_final_boundary() {
    let err = decode_err(
        "--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--XYZ\r\n",
        "XYZ",
    )
    .await;

    assert_eq!(err, DecodeError::MissingFinalBoundary);
    assert_eq!(err.kind(), ErrorKind::MissingFinalBoundary);
    assert!(err.is_client_error());
}

#[tokio::test]
async fn body_ending_inside_a_part_is_missing_final_boundary() {
    let err = decode_err(
        "--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nhalf a val",
        "XYZ",
    )
    .await;

    assert_eq!(err, DecodeError::MissingFinalBoundary);
}

#[tokio::test]
async fn declared_boundary_absent_from_body_is_missing_final_boundary() {
    let err = decode_err(
        "--ABC\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--ABC--\r\n",
        "DEF",
    )
    .await;

    assert_eq!(err, DecodeError::BoundaryMismatch);
    assert_eq!(err.kind(), ErrorKind::MissingFinalBoundary);
    assert_err_contains(&err, "never found");
}

#[tokio::test]
async fn empty_body_is_missing_final_boundary() {
    let err = decode(&BodyHandle::empty(), "XYZ")
        .expect("decode should start")
        .collect_parts()
        .await
        .expect_err("decode must fail");

    assert_eq!(err, DecodeError::MissingFinalBoundary);
}

#[tokio::test]
async fn overlong_boundary_is_rejected_before_reading() {
    let body = BodyHandle::from_bytes("--irrelevant--\r\n");
    let boundary = "b".repeat(71);

    let err = decode(&body, &boundary).expect_err("boundary must be rejected");

    assert_eq!(err.kind(), ErrorKind::InvalidBoundaryHeader);
    assert_err_contains(&err, "70 bytes");
    assert_eq!(body.state(), BodyState::Unread);
    assert!(decode(&body, "b").is_ok());
}

#[tokio::test]
async fn seventy_byte_boundary_is_accepted() {
    let boundary = "b".repeat(70);
    let raw = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--{boundary}--\r\n"
    );

    let parts = decode(&BodyHandle::from_bytes(raw), &boundary)
        .expect("decode should start")
        .collect_parts()
        .await
        .expect("body should decode");
    assert_eq!(parts.len(), 1);
}

#[tokio::test]
async fn content_type_without_boundary_is_rejected() {
    let decoder = MultipartDecoder::new();
    let body = BodyHandle::from_bytes("--x--\r\n");

    let err = decoder
        .decode_content_type(&body, "multipart/form-data")
        .expect_err("missing boundary must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidBoundaryHeader);
    assert_err_contains(&err, "missing boundary parameter");

    let err = decoder
        .decode_content_type(&body, "application/json; boundary=x")
        .expect_err("non-multipart type must fail");
    assert_err_contains(&err, "multipart/form-data");
    assert_eq!(body.state(), BodyState::Unread);
}

#[tokio::test]
async fn body_ending_mid_delimiter_is_truncated() {
    let err = decode_err(
        "--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--XY",
        "XYZ",
    )
    .await;
    assert_eq!(err, DecodeError::TruncatedBoundary);

    let err = decode_err(
        "--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--XYZ-",
        "XYZ",
    )
    .await;
    assert_eq!(err.kind(), ErrorKind::TruncatedBoundary);
}

#[tokio::test]
async fn malformed_header_line_is_a_header_error() {
    let err = decode_err(
        "--H\r\nContent-Disposition: form-data; name=\"a\"\r\nnot a header\r\n\r\nv\r\n--H--\r\n",
        "H",
    )
    .await;

    assert_eq!(err.kind(), ErrorKind::HeaderParseError);
    assert_err_contains(&err, "invalid header line");
}

#[tokio::test]
async fn part_without_disposition_is_a_header_error() {
    let err = decode_err(
        "--H\r\nContent-Type: text/plain\r\n\r\nv\r\n--H--\r\n",
        "H",
    )
    .await;

    assert_err_contains(&err, "missing Content-Disposition header");
}

#[tokio::test]
async fn part_without_name_is_missing_field_name() {
    let err = decode_err(
        "--N\r\nContent-Disposition: form-data; filename=\"a.txt\"\r\n\r\nv\r\n--N--\r\n",
        "N",
    )
    .await;
    assert_eq!(err, DecodeError::MissingFieldName);

    let err = decode_err(
        "--N\r\nContent-Disposition: form-data; name=\"\"\r\n\r\nv\r\n--N--\r\n",
        "N",
    )
    .await;
    assert_eq!(err.kind(), ErrorKind::MissingFieldName);
}

#[tokio::test]
async fn body_ending_inside_headers_is_unexpected_end() {
    let err = decode_err("--U\r\nContent-Disposition: form-da", "U").await;

    assert_eq!(err, DecodeError::UnexpectedEndOfStream);
    assert!(err.is_client_error());
}

#[tokio::test]
async fn source_failure_surfaces_and_is_not_a_client_error() {
    let chunks = vec![
        Ok(Bytes::from_static(
            b"--S\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nval",
        )),
        Err(SourceError::new("connection reset")),
    ];
    let body = BodyHandle::new(stream::iter(chunks));

    let err = decode(&body, "S")
        .expect("decode should start")
        .collect_parts()
        .await
        .expect_err("source failure must surface");

    assert_eq!(err.kind(), ErrorKind::Source);
    assert_err_contains(&err, "connection reset");
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn stream_stops_after_the_first_error() {
    let body = BodyHandle::from_bytes(concat!(
        "--E\r\n",
        "Content-Disposition: form-data; name=\"ok\"\r\n",
        "\r\n",
        "fine\r\n",
        "--E\r\n",
        "Content-Disposition: form-data\r\n",
        "\r\n",
        "nameless\r\n",
        "--E--\r\n"
    ));
    let mut multipart = decode(&body, "E").expect("decode should start");

    let first = multipart
        .next()
        .await
        .expect("first item")
        .expect("first part should decode");
    assert_eq!(first.name(), "ok");

    let err = multipart
        .next()
        .await
        .expect("second item")
        .expect_err("second part must fail");
    assert_eq!(err, DecodeError::MissingFieldName);
    assert_eq!(
        multipart.state(),
        ParseState::Errored(ErrorKind::MissingFieldName)
    );

    assert!(multipart.next().await.is_none());
    assert_eq!(body.state(), BodyState::Consumed);
}

#[tokio::test]
async fn collect_is_all_or_nothing() {
    let err = decode_err(
        concat!(
            "--E\r\n",
            "Content-Disposition: form-data; name=\"ok\"\r\n",
            "\r\n",
            "fine\r\n",
            "--E\r\n",
            "Content-Disposition: form-data; name=\"also\"\r\n",
            "\r\n",
            "cut off"
        ),
        "E",
    )
    .await;

    assert_eq!(err, DecodeError::MissingFinalBoundary);
}

#[tokio::test]
async fn reading_a_handle_twice_is_double_consumption() {
    let body = BodyHandle::from_bytes("--D--\r\n");
    let multipart = decode(&body, "D").expect("first decode should start");

    let err = decode(&body, "D").expect_err("second decode must fail");
    assert_eq!(err, DecodeError::DoubleConsumption);
    assert!(!err.is_client_error());

    multipart.collect_parts().await.expect("first decode succeeds");
    let err = decode(&body, "D").expect_err("consumed handle must fail");
    assert_eq!(err.kind(), ErrorKind::DoubleConsumption);
}
