#![allow(missing_docs)]

use bytes::Bytes;
use formtee::{decode, BodyHandle, DecodeError, ErrorKind, Part};
use futures::TryStreamExt;

async fn first_part(body: impl Into<Bytes>) -> Part {
    decode(&BodyHandle::from_bytes(body), "BOUND")
        .expect("boundary should be valid")
        .next_part()
        .await
        .expect("part should parse")
        .expect("part expected")
}

#[tokio::test]
async fn exposes_metadata_accessors() {
    let part = first_part(concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"face.png\"\r\n",
        "Content-Type: image/png\r\n",
        "X-Extra: kept\r\n",
        "\r\n",
        "abc\r\n",
        "--BOUND--\r\n"
    ))
    .await;

    assert_eq!(part.name(), "avatar");
    assert_eq!(part.filename(), Some("face.png"));
    assert!(part.is_file());
    assert_eq!(part.content_type(), Some(&mime::IMAGE_PNG));
    assert_eq!(part.effective_content_type(), mime::IMAGE_PNG);
    assert_eq!(
        part.headers()
            .get("content-disposition")
            .and_then(|value| value.to_str().ok()),
        Some("form-data; name=\"avatar\"; filename=\"face.png\"")
    );
    assert_eq!(
        part.headers().get("x-extra").and_then(|value| value.to_str().ok()),
        Some("kept")
    );
    assert_eq!(part.parsed_headers().name, "avatar");
    assert_eq!(part.len(), 3);
    assert!(!part.is_empty());
}

#[tokio::test]
async fn text_fields_default_to_text_plain() {
    let part = first_part(
        "--BOUND\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--BOUND--\r\n",
    )
    .await;

    assert!(!part.is_file());
    assert_eq!(part.content_type(), None);
    assert_eq!(part.effective_content_type(), mime::TEXT_PLAIN);
}

#[tokio::test]
async fn empty_filename_still_marks_a_file_part() {
    let part = first_part(concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"upload\"; filename=\"\"\r\n",
        "Content-Type: application/octet-stream\r\n",
        "\r\n",
        "\r\n",
        "--BOUND--\r\n"
    ))
    .await;

    assert_eq!(part.filename(), Some(""));
    assert!(part.is_file());
    assert!(part.is_empty());
}

#[tokio::test]
async fn part_without_body_line_is_empty() {
    let part = first_part(concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"blank\"\r\n",
        "\r\n",
        "--BOUND--\r\n"
    ))
    .await;

    assert_eq!(part.name(), "blank");
    assert!(part.is_empty());
}

#[tokio::test]
async fn bytes_are_single_pass() {
    let mut part = first_part(
        "--BOUND\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nhello\r\n--BOUND--\r\n",
    )
    .await;

    let payload = part.bytes().await.expect("bytes should be readable");
    assert_eq!(payload, Bytes::from_static(b"hello"));
    assert_eq!(part.body(), &Bytes::from_static(b"hello"));

    let err = part.bytes().await.expect_err("second read must fail");
    assert_already_consumed(err);
}

#[tokio::test]
async fn stream_is_single_pass_and_returns_body() {
    let mut part = first_part(
        "--BOUND\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nstream-body\r\n--BOUND--\r\n",
    )
    .await;

    let stream = part.stream().expect("first read");
    let chunks = stream.try_collect::<Vec<_>>().await.expect("stream should read");
    assert_eq!(chunks, vec![Bytes::from_static(b"stream-body")]);

    let err = part.text().await.expect_err("second read must fail");
    assert_already_consumed(err);
}

#[tokio::test]
async fn text_rejects_non_utf8_payloads() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"--BOUND\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\n");
    bytes.extend_from_slice(&[0x66, 0x6f, 0x80]);
    bytes.extend_from_slice(b"\r\n--BOUND--\r\n");

    let mut part = first_part(bytes).await;

    let err = part.text().await.expect_err("invalid UTF-8 should fail");
    assert_eq!(err.kind(), ErrorKind::InvalidUtf8);
    assert!(err.to_string().contains("`note`"), "unexpected error: {err}");
}

#[tokio::test]
async fn into_parts_hands_back_headers_and_body() {
    let part = first_part(concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"doc\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf\r\n",
        "Content-Type: application/pdf\r\n",
        "\r\n",
        "%PDF\r\n",
        "--BOUND--\r\n"
    ))
    .await;

    let (headers, body) = part.into_parts();
    assert_eq!(headers.name, "doc");
    assert_eq!(headers.filename.as_deref(), Some("résumé.pdf"));
    assert_eq!(
        headers.content_type.as_ref().map(|mime| mime.essence_str()),
        Some("application/pdf")
    );
    assert_eq!(body, Bytes::from_static(b"%PDF"));
}

fn assert_already_consumed(err: DecodeError) {
    assert_eq!(err, DecodeError::DoubleConsumption);
    assert!(
        err.to_string().contains("already been consumed"),
        "unexpected error: {err}"
    );
}
