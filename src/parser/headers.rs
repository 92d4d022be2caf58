use http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::{error::DecodeError, parser::percent};

/// Parsed `Content-Disposition` metadata for a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, normally `form-data`.
    pub disposition: String,
    /// Field name (`name` parameter).
    pub name: Option<String>,
    /// File name (`filename*` when present, otherwise `filename`).
    pub filename: Option<String>,
}

/// Header model of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHeaders {
    /// Every header line of the part, in order.
    pub raw: HeaderMap,
    /// Parsed content disposition.
    pub disposition: ContentDisposition,
    /// Field name; never empty.
    pub name: String,
    /// File name, when the part is a file upload.
    pub filename: Option<String>,
    /// Declared part content type, if any.
    pub content_type: Option<mime::Mime>,
}

/// Parses a header block (without its terminating blank line) into a [`HeaderMap`].
///
/// Lines end in CRLF; bare LF is accepted when `lenient` is set.
pub fn parse_header_block(raw: &[u8], lenient: bool) -> Result<HeaderMap, DecodeError> {
    let text =
        std::str::from_utf8(raw).map_err(|_| DecodeError::header("part headers must be UTF-8"))?;
    let mut headers = HeaderMap::new();

    for line in text.split('\n') {
        let line = match line.strip_suffix('\r') {
            Some(line) => line,
            None if lenient => line,
            // Empty segment after the last line break.
            None if line.is_empty() => continue,
            None => return Err(DecodeError::header("header line must end with CRLF")),
        };
        if line.is_empty() {
            continue;
        }

        let Some((raw_name, raw_value)) = line.split_once(':') else {
            return Err(DecodeError::header(format!("invalid header line `{line}`")));
        };

        let name = raw_name
            .trim()
            .parse::<HeaderName>()
            .map_err(|_| DecodeError::header(format!("invalid header name `{}`", raw_name.trim())))?;
        // Browsers send UTF-8 names and filenames unescaped.
        let value = HeaderValue::from_bytes(raw_value.trim().as_bytes())
            .map_err(|_| DecodeError::header(format!("invalid value for header `{name}`")))?;
        headers.append(name, value);
    }

    Ok(headers)
}

/// Parses a multipart part `Content-Disposition` value.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition, DecodeError> {
    let mut segments = split_unquoted(value, ';').into_iter();
    let disposition = segments
        .next()
        .map(|segment| segment.trim().to_ascii_lowercase())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| DecodeError::header("empty Content-Disposition"))?;

    let mut name = None;
    let mut filename = None;
    let mut filename_ext = None;

    for segment in segments {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some((key, raw_value)) = trimmed.split_once('=') else {
            return Err(DecodeError::header(format!(
                "Content-Disposition parameter `{trimmed}` has no value"
            )));
        };

        let value = unquote(raw_value.trim())?;
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "filename" => filename = Some(decode_filename(&value)?),
            "filename*" => filename_ext = Some(decode_ext_value(&value)?),
            _ => {}
        }
    }

    Ok(ContentDisposition {
        disposition,
        name,
        filename: filename_ext.or(filename),
    })
}

/// Parses an optional part `Content-Type` value.
pub fn parse_part_content_type(value: Option<&str>) -> Result<Option<mime::Mime>, DecodeError> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<mime::Mime>()
                .map_err(|_| DecodeError::header(format!("invalid part Content-Type `{raw}`")))
        })
        .transpose()
}

/// Extracts the part model from its parsed header map.
pub fn parse_part_headers(raw: HeaderMap) -> Result<PartHeaders, DecodeError> {
    let disposition = raw
        .get(header::CONTENT_DISPOSITION)
        .ok_or_else(|| DecodeError::header("missing Content-Disposition header"))?;
    let disposition = header_text(disposition, "Content-Disposition")?;
    let disposition = parse_content_disposition(disposition)?;

    if disposition.disposition != "form-data" {
        return Err(DecodeError::header(format!(
            "unsupported disposition `{}`",
            disposition.disposition
        )));
    }

    let name = disposition
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(DecodeError::MissingFieldName)?;

    let content_type = raw
        .get(header::CONTENT_TYPE)
        .map(|value| header_text(value, "Content-Type"))
        .transpose()?;
    let content_type = parse_part_content_type(content_type)?;

    Ok(PartHeaders {
        filename: disposition.filename.clone(),
        raw,
        disposition,
        name,
        content_type,
    })
}

fn header_text<'a>(value: &'a HeaderValue, name: &str) -> Result<&'a str, DecodeError> {
    std::str::from_utf8(value.as_bytes())
        .map_err(|_| DecodeError::header(format!("{name} header must be UTF-8")))
}

fn unquote(raw: &str) -> Result<String, DecodeError> {
    let Some(inner) = raw.strip_prefix('"') else {
        if raw.contains('"') {
            return Err(DecodeError::header("stray quote in parameter value"));
        }
        return Ok(raw.to_owned());
    };

    let inner = inner
        .strip_suffix('"')
        .ok_or_else(|| DecodeError::header("unterminated quoted parameter value"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| DecodeError::header("dangling escape in quoted parameter"))?;
            out.push(escaped);
        } else {
            out.push(ch);
        }
    }

    Ok(out)
}

fn decode_filename(value: &str) -> Result<String, DecodeError> {
    if !value.contains('%') {
        return Ok(value.to_owned());
    }

    percent::decode_utf8(value).map_err(|err| DecodeError::header(format!("filename {err}")))
}

// RFC 5987 `charset'language'value`; only UTF-8 is accepted.
fn decode_ext_value(value: &str) -> Result<String, DecodeError> {
    let mut pieces = value.splitn(3, '\'');
    let (Some(charset), Some(_language), Some(encoded)) =
        (pieces.next(), pieces.next(), pieces.next())
    else {
        return Err(DecodeError::header("malformed filename* parameter"));
    };

    if !charset.eq_ignore_ascii_case("utf-8") {
        return Err(DecodeError::header(format!(
            "unsupported filename* charset `{charset}`"
        )));
    }

    percent::decode_utf8(encoded).map_err(|err| DecodeError::header(format!("filename* {err}")))
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ch if ch == separator && !in_quotes => {
                segments.push(&value[start..index]);
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }

    segments.push(&value[start..]);
    segments
}
