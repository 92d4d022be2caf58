#![allow(missing_docs)]

use bytes::Bytes;
use formtee::{
    limits::DEFAULT_MAX_HEADER_SIZE, BodyHandle, ConfigError, DecodeError, DecoderBuilder,
    DecoderConfig, Limits, MultipartDecoder, SourceError,
};

#[test]
fn default_config_is_valid() {
    let config = DecoderConfig::default();

    assert!(config.validate().is_ok());
    assert!(!config.lenient_line_endings);
    assert_eq!(config.segment_size, 16 * 1024);
    assert_eq!(config.limits.max_header_size, Some(DEFAULT_MAX_HEADER_SIZE));
    assert_eq!(config.limits.max_body_size, None);
}

#[test]
fn rejects_zero_segment_size() {
    let config = DecoderConfig {
        segment_size: 0,
        ..DecoderConfig::default()
    };

    assert_eq!(config.validate(), Err(ConfigError::InvalidSegmentSize));
}

#[test]
fn rejects_invalid_numeric_limit_values() {
    let config = DecoderConfig {
        limits: Limits {
            max_parts: Some(0),
            ..Limits::default()
        },
        ..DecoderConfig::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLimitValue { limit: "max_parts" })
    ));
}

#[test]
fn rejects_part_limit_greater_than_max_body_size() {
    let limits = Limits {
        max_body_size: Some(8),
        max_part_size: Some(16),
        ..Limits::default()
    };

    let result = limits.validate();
    assert!(matches!(
        result,
        Err(ConfigError::LimitExceedsBodySize {
            limit: "max_part_size",
            value: 16,
            max_body_size: 8
        })
    ));
}

#[test]
fn unlimited_limits_bound_nothing() {
    let limits = Limits::unlimited();

    assert!(limits.validate().is_ok());
    assert_eq!(limits.max_header_size, None);
    assert_eq!(limits.max_part_size, None);
}

#[test]
fn builder_validation_surfaces_config_errors() {
    let result = DecoderBuilder::new().segment_size(0).build_config();
    assert_eq!(result, Err(ConfigError::InvalidSegmentSize));

    let result = MultipartDecoder::builder()
        .limits(Limits {
            max_body_size: Some(0),
            ..Limits::default()
        })
        .build();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidLimitValue {
            limit: "max_body_size"
        })
    ));
}

#[test]
fn builder_applies_settings() {
    let decoder = MultipartDecoder::builder()
        .lenient_line_endings(true)
        .segment_size(512)
        .limits(Limits::unlimited())
        .build()
        .expect("builder should validate");

    assert!(decoder.config().lenient_line_endings);
    assert_eq!(decoder.config().segment_size, 512);
    assert_eq!(decoder.config().limits, Limits::unlimited());
}

#[test]
fn with_config_validates_explicit_configuration() {
    let invalid = DecoderConfig {
        segment_size: 0,
        ..DecoderConfig::default()
    };

    assert!(MultipartDecoder::with_config(invalid.clone()).is_err());
    assert!(DecoderBuilder::new().with_config(invalid).validate().is_err());
}

#[tokio::test]
async fn lenient_line_endings_accept_bare_lf() {
    let raw = "--L\nContent-Disposition: form-data; name=\"a\"\n\nvalue\n--L--\n";

    let lenient = MultipartDecoder::builder()
        .lenient_line_endings(true)
        .build()
        .expect("builder should validate");
    let parts = lenient
        .decode_all(&BodyHandle::from_bytes(raw), "L")
        .await
        .expect("lenient decode should succeed");
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].body(), &Bytes::from_static(b"value"));

    let err = MultipartDecoder::new()
        .decode_all(&BodyHandle::from_bytes(raw), "L")
        .await
        .expect_err("strict decode must fail");
    assert_eq!(err, DecodeError::BoundaryMismatch);
}

#[tokio::test]
async fn decoder_handles_use_the_configured_segment_size() {
    let decoder = MultipartDecoder::builder()
        .segment_size(4)
        .build()
        .expect("builder should validate");
    let chunk = Bytes::from_static(b"0123456789");
    let handle = decoder.handle(futures::stream::iter([Ok::<_, SourceError>(chunk)]));
    let copy = handle.try_clone().expect("clone");

    let mut reader = copy.take_reader().expect("reader");
    let first = futures::StreamExt::next(&mut reader)
        .await
        .expect("item")
        .expect("segment");
    assert_eq!(first, Bytes::from_static(b"0123"));
    assert_eq!(
        reader.tee_stats().map(|stats| stats.appended_segments),
        Some(3)
    );
}

#[cfg(feature = "serde")]
#[test]
fn config_round_trips_through_serde_defaults() {
    let config: DecoderConfig =
        serde_json::from_str(r#"{"lenient_line_endings": true}"#).expect("partial config");

    assert!(config.lenient_line_endings);
    assert_eq!(config.segment_size, DecoderConfig::default().segment_size);
}
