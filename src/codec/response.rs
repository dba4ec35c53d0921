use http::{HeaderMap, StatusCode};

use super::WireError;
use super::headers::{read_header_block, write_header_block};
use super::line::LineReader;

/// Serializes `HTTP/1.1 STATUS REASON` and the header block. Unknown status
/// codes get an empty reason phrase.
pub fn encode_response_header(status: StatusCode, headers: &HeaderMap) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(256);
    let status_line = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    buffer.extend_from_slice(status_line.as_bytes());
    write_header_block(headers, &mut buffer);
    buffer
}

pub fn decode_response_header(data: &[u8]) -> Result<(StatusCode, HeaderMap), WireError> {
    let mut reader = LineReader::new(data);
    let line = reader.next_str_line("status line")?;

    let fields: Vec<&str> = line.splitn(3, ' ').collect();
    if fields.len() < 2 {
        return Err(WireError::StatusLine(line.to_string()));
    }
    let code = fields[1];
    let status = code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| WireError::StatusCode(code.to_string()))?;

    let headers = read_header_block(&mut reader)?;
    Ok((status, headers))
}
