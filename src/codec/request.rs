use std::str::FromStr;

use http::header::HOST;
use http::{Method, Request, Uri};
use tracing::debug;

use super::headers::{read_header_block, write_header_block};
use super::line::LineReader;
use super::{WireError, parse_version, version_token};

/// Serializes a request line and header block. Relative targets are made
/// absolute first so the stored record always decodes to a full URL.
pub fn encode_request(request: &Request<()>) -> Result<Vec<u8>, WireError> {
    let uri = absolute_uri(request)?;
    let mut buffer = Vec::with_capacity(256);
    buffer.extend_from_slice(request.method().as_str().as_bytes());
    buffer.push(b' ');
    buffer.extend_from_slice(uri.to_string().as_bytes());
    buffer.push(b' ');
    buffer.extend_from_slice(version_token(request.version()).as_bytes());
    buffer.extend_from_slice(b"\r\n");
    write_header_block(request.headers(), &mut buffer);
    Ok(buffer)
}

pub fn decode_request(data: &[u8]) -> Result<Request<()>, WireError> {
    let mut reader = LineReader::new(data);
    let line = reader.next_str_line("request line")?;

    let fields: Vec<&str> = line.splitn(3, ' ').collect();
    if fields.len() < 3 {
        return Err(WireError::RequestLine(line.to_string()));
    }
    let (method, target, protocol) = (fields[0], fields[1], fields[2]);
    debug!(method, target, protocol, "decoding stored request line");

    let method =
        Method::from_bytes(method.as_bytes()).map_err(|_| WireError::Method(method.to_string()))?;
    let uri = Uri::from_str(target).map_err(|_| WireError::Url(target.to_string()))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(WireError::Url(target.to_string()));
    }
    let version =
        parse_version(protocol).ok_or_else(|| WireError::Protocol(protocol.to_string()))?;

    let headers = read_header_block(&mut reader)?;

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;
    Ok(request)
}

fn absolute_uri(request: &Request<()>) -> Result<Uri, WireError> {
    let uri = request.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Ok(uri.clone());
    }

    let host = match uri.authority() {
        Some(authority) => authority.as_str().to_string(),
        None => request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .ok_or_else(|| WireError::MissingHost(uri.to_string()))?,
    };
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/");
    let rewritten = format!("http://{host}{path}");
    debug!(original = %uri, rewritten, "rewrote relative request target");
    Uri::from_str(&rewritten).map_err(|_| WireError::Url(rewritten))
}
