use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use parking_lot::Mutex;

use httpstash::upstream::{UpstreamClient, UpstreamError, UpstreamResponse};

/// In-process upstream that replays queued outcomes and records the URLs it
/// was asked for.
#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    outcomes: Mutex<VecDeque<Result<UpstreamResponse, UpstreamError>>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, headers: HeaderMap, body: &'static [u8]) -> Self {
        self.outcomes
            .lock()
            .push_back(Ok(upstream_response(status, headers, body)));
        self
    }

    pub fn fail(self, err: UpstreamError) -> Self {
        self.outcomes.lock().push_back(Err(err));
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

pub fn upstream_response(status: u16, headers: HeaderMap, body: &'static [u8]) -> UpstreamResponse {
    UpstreamResponse {
        status: StatusCode::from_u16(status).expect("valid test status"),
        headers,
        body: Bytes::from_static(body),
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn send(&self, request: &Request<()>) -> Result<UpstreamResponse, UpstreamError> {
        self.seen.lock().push(request.uri().to_string());
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::new("script exhausted")))
    }
}
