use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use super::WireError;
use super::line::LineReader;

/// Title-cases a header name the way MIME readers canonicalize keys
/// (`content-type` becomes `Content-Type`, `etag` becomes `Etag`).
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if upper {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch.to_ascii_lowercase());
        }
        upper = ch == '-';
    }
    out
}

/// Appends `Name: value\r\n` for every header, sorted by canonical name, and
/// the blank line that closes the block.
pub fn write_header_block(headers: &HeaderMap, buffer: &mut Vec<u8>) {
    let mut names: Vec<(String, &HeaderName)> = headers
        .keys()
        .map(|name| (canonical_header_name(name.as_str()), name))
        .collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));

    for (canonical, name) in names {
        for value in headers.get_all(name) {
            buffer.extend_from_slice(canonical.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes().trim_ascii());
            buffer.extend_from_slice(b"\r\n");
        }
    }
    buffer.extend_from_slice(b"\r\n");
}

/// Reads a MIME header block up to and including its terminating blank line.
/// Continuation lines are folded into the previous value.
pub(super) fn read_header_block(reader: &mut LineReader<'_>) -> Result<HeaderMap, WireError> {
    let mut map = HeaderMap::new();
    let mut pending: Option<(HeaderName, Vec<u8>)> = None;

    loop {
        let line = reader
            .next_line()
            .ok_or(WireError::UnexpectedEof("header block"))?;
        if line.is_empty() {
            flush_pending(&mut map, pending.take())?;
            return Ok(map);
        }

        if matches!(line[0], b' ' | b'\t') {
            match pending.as_mut() {
                Some((_, value)) => {
                    value.push(b' ');
                    value.extend_from_slice(line.trim_ascii());
                    continue;
                }
                None => return Err(WireError::HeaderLine(lossy(line))),
            }
        }

        flush_pending(&mut map, pending.take())?;
        let colon = line
            .iter()
            .position(|byte| *byte == b':')
            .ok_or_else(|| WireError::HeaderLine(lossy(line)))?;
        let name = HeaderName::from_bytes(&line[..colon])
            .map_err(|_| WireError::HeaderLine(lossy(line)))?;
        pending = Some((name, line[colon + 1..].trim_ascii().to_vec()));
    }
}

fn flush_pending(
    map: &mut HeaderMap,
    pending: Option<(HeaderName, Vec<u8>)>,
) -> Result<(), WireError> {
    if let Some((name, value)) = pending {
        let value = HeaderValue::from_bytes(&value)
            .map_err(|_| WireError::HeaderLine(format!("{}: {}", name, lossy(&value))))?;
        map.append(name, value);
    }
    Ok(())
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
