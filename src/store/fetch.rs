use std::time::SystemTime;

use http::{HeaderMap, Request};

use super::{ExchangeStore, Result, StoreError};
use crate::response::{Response, copy_headers};
use crate::upstream::{UpstreamError, UpstreamResponse};

/// Key that stands for "use the request URL".
const URL_KEY: &str = "dummy";

impl ExchangeStore {
    /// Sends `request` through the configured upstream client and stores the
    /// response under `key`.
    ///
    /// A key of `dummy` (any case) is replaced by the request URL. An upstream
    /// error that signals a stopped redirect and still carries the redirect
    /// response is treated as success and that response is stored.
    pub async fn fetch_and_store_response(
        &self,
        request: &Request<()>,
        key: &str,
        overwrite: bool,
    ) -> Result<()> {
        let key = if key.eq_ignore_ascii_case(URL_KEY) {
            request.uri().to_string()
        } else {
            key.to_string()
        };

        let Some(client) = self.upstream() else {
            crate::metrics::record_upstream_fetch("unconfigured");
            return Err(StoreError::Transport(
                "no upstream client configured".to_string(),
            ));
        };

        let request_time = SystemTime::now();
        let fetched = match client.send(request).await {
            Ok(fetched) => fetched,
            Err(err) => swallow_redirect(err)?,
        };
        crate::metrics::record_upstream_fetch("ok");

        let mut response = into_response(fetched);
        response.request_time = Some(request_time);
        response.response_time = Some(SystemTime::now());

        let result = self.store_response(&mut response, &key, overwrite).await;
        if let Err(StoreError::WriteInProgress) = &result {
            tracing::debug!(key = %key, overwrite, "fetched response already being written");
        }
        result
    }
}

fn swallow_redirect(err: UpstreamError) -> Result<UpstreamResponse> {
    let redirect = err.is_redirect_signal();
    match err.response {
        Some(response) if redirect => {
            tracing::debug!(status = %response.status, "storing redirect response");
            Ok(response)
        }
        _ => {
            crate::metrics::record_upstream_fetch("error");
            tracing::debug!(error = %err.message, "upstream fetch failed");
            Err(StoreError::Transport(err.message))
        }
    }
}

fn into_response(fetched: UpstreamResponse) -> Response {
    let mut headers = HeaderMap::new();
    copy_headers(&fetched.headers, &mut headers);
    Response::from_bytes(fetched.status, fetched.body, headers)
}
