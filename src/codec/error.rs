use http::{Method, Request, Uri};
use thiserror::Error;

use super::PLACEHOLDER_URL;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of record while reading {0}")]
    UnexpectedEof(&'static str),
    #[error("record line contained invalid bytes")]
    InvalidUtf8,
    #[error("malformed HTTP request line: {0}")]
    RequestLine(String),
    #[error("malformed HTTP response: {0}")]
    StatusLine(String),
    #[error("malformed HTTP status code: {0}")]
    StatusCode(String),
    #[error("invalid method '{0}'")]
    Method(String),
    #[error("invalid request URL '{0}'")]
    Url(String),
    #[error("unsupported protocol '{0}'")]
    Protocol(String),
    #[error("malformed MIME header line: {0}")]
    HeaderLine(String),
    #[error("request URL '{0}' is relative and the request carries no host")]
    MissingHost(String),
}

impl WireError {
    /// Stand-in request for diagnostics when a record fails to decode.
    ///
    /// Never treat this as stored data.
    pub fn placeholder_request() -> Request<()> {
        let mut request = Request::new(());
        *request.method_mut() = Method::GET;
        *request.uri_mut() = Uri::from_static(PLACEHOLDER_URL);
        request
    }
}
