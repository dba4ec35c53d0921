//! In-memory response entity handed out by the store.

use std::fmt;
use std::io::{self, Cursor, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, DATE, ETAG, EXPIRES, HeaderValue, LAST_MODIFIED};
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use crate::store::fs::Body;

const VIA_PSEUDONYM: &str = "httpstash";
const CONTENT_TYPE_PLACEHOLDER: &str = "    ";

/// A stored or fetched response: status, headers and a seekable body.
///
/// Staleness is never computed here. Callers that decide an entry is stale
/// record it with [`Response::mark_stale`].
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    stale: bool,
    pub request_time: Option<SystemTime>,
    pub response_time: Option<SystemTime>,
}

impl Response {
    pub fn new(status: StatusCode, body: Body, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            body,
            stale: false,
            request_time: None,
            response_time: None,
        }
    }

    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>, headers: HeaderMap) -> Self {
        Self::new(status, Box::new(Cursor::new(body.into())), headers)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// 2xx and 3xx.
    pub fn is_non_error_status(&self) -> bool {
        (200..400).contains(&self.status.as_u16())
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.header_date(LAST_MODIFIED.as_str())
    }

    /// `Ok(None)` when the header is absent; an unparsable value is an error.
    pub fn expires(&self) -> Result<Option<SystemTime>, httpdate::Error> {
        match self.headers.get(EXPIRES) {
            None => Ok(None),
            // Non-ASCII values fail to parse like any other malformed date.
            Some(value) => httpdate::parse_http_date(value.to_str().unwrap_or_default()).map(Some),
        }
    }

    /// Whether the `Date` header is strictly later than `reference`. Missing or
    /// unparsable dates compare as not after.
    pub fn date_after(&self, reference: SystemTime) -> bool {
        self.header_date(DATE.as_str()).is_some_and(|date| date > reference)
    }

    pub fn has_validators(&self) -> bool {
        self.headers.contains_key(LAST_MODIFIED) || self.headers.contains_key(ETAG)
    }

    pub fn via(&self) -> String {
        format!("1.1 {VIA_PSEUDONYM}")
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    fn header_date(&self, name: &str) -> Option<SystemTime> {
        let value = self.headers.get(name)?.to_str().ok()?;
        httpdate::parse_http_date(value).ok()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("stale", &self.stale)
            .field("request_time", &self.request_time)
            .field("response_time", &self.response_time)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for Response {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_read(cx, buf)
    }
}

impl AsyncSeek for Response {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().body).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().body).poll_complete(cx)
    }
}

/// Replaces `dst` with the contents of `src`. A response without a
/// `Content-Type` gets a blank placeholder so downstream writers always see
/// one.
pub fn copy_headers(src: &HeaderMap, dst: &mut HeaderMap) {
    dst.clear();
    for (name, value) in src {
        dst.append(name.clone(), value.clone());
    }
    if !dst.contains_key(CONTENT_TYPE) {
        dst.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_PLACEHOLDER),
        );
    }
}
