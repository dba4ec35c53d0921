//! Byte-exact encoding of stored request and response-header records.
//!
//! A request record is `METHOD SP ABSOLUTE-URL SP PROTOCOL CRLF` followed by a
//! MIME header block; a response-header record is `HTTP/1.1 SP STATUS SP REASON
//! CRLF` followed by the same header block. The header block always ends with a
//! blank line so a reader can find its end even when there are no headers.

mod error;
mod headers;
mod line;
mod request;
mod response;

pub use error::WireError;
pub use headers::{canonical_header_name, write_header_block};
pub use request::{decode_request, encode_request};
pub use response::{decode_response_header, encode_response_header};

use http::Version;

pub(crate) const PLACEHOLDER_URL: &str = "http://dummy";

pub(crate) fn version_token(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

pub(crate) fn parse_version(token: &str) -> Option<Version> {
    match token {
        "HTTP/0.9" => Some(Version::HTTP_09),
        "HTTP/1.0" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Some(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Some(Version::HTTP_3),
        _ => None,
    }
}
