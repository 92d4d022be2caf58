use thiserror::Error;

/// Percent-decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum PercentError {
    #[error("has invalid percent-encoding")]
    InvalidEncoding,
    #[error("is not valid UTF-8 after percent-decoding")]
    InvalidUtf8,
}

/// Decodes `%XX` escapes and requires the result to be UTF-8.
pub(crate) fn decode_utf8(value: &str) -> Result<String, PercentError> {
    let raw = value.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut index = 0;

    while index < raw.len() {
        if raw[index] == b'%' {
            let (Some(&hi), Some(&lo)) = (raw.get(index + 1), raw.get(index + 2)) else {
                return Err(PercentError::InvalidEncoding);
            };
            bytes.push((hex_value(hi)? << 4) | hex_value(lo)?);
            index += 3;
            continue;
        }

        bytes.push(raw[index]);
        index += 1;
    }

    String::from_utf8(bytes).map_err(|_| PercentError::InvalidUtf8)
}

fn hex_value(byte: u8) -> Result<u8, PercentError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(PercentError::InvalidEncoding),
    }
}
