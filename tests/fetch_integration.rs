mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use http::StatusCode;

use httpstash::store::layout::{ResourceClass, path_for};
use httpstash::store::{ExchangeStore, MarkerExclusion, StoreError, WriteExclusion};
use httpstash::upstream::{ReqwestClient, UpstreamError};

use support::scripted::upstream_response;
use support::*;

#[tokio::test]
async fn dummy_key_stores_under_request_url() -> Result<()> {
    let upstream = Arc::new(ScriptedUpstream::new().respond(
        200,
        header_map(&[("content-type", "text/plain")]),
        b"hello",
    ));
    let store = store_with_upstream(upstream.clone());
    let request = get_request("http://example.com/page", &[]);

    store
        .fetch_and_store_response(&request, "DuMmY", false)
        .await?;
    assert_eq!(upstream.seen(), vec!["http://example.com/page"]);

    let mut response = store.retrieve_response("http://example.com/page").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(&mut response).await?, b"hello");
    assert!(matches!(
        store.retrieve_response("dummy").await.unwrap_err(),
        StoreError::NotFound
    ));
    Ok(())
}

#[tokio::test]
async fn missing_content_type_gets_placeholder() -> Result<()> {
    let upstream = Arc::new(ScriptedUpstream::new().respond(204, header_map(&[]), b"-"));
    let store = store_with_upstream(upstream);
    store
        .fetch_and_store_response(&get_request("http://example.com/", &[]), "k", false)
        .await?;
    let header = store.retrieve_response_header("k").await?;
    assert_eq!(header.status, StatusCode::NO_CONTENT);
    assert!(header.headers.contains_key("content-type"));
    Ok(())
}

#[tokio::test]
async fn redirect_signal_with_response_is_stored() -> Result<()> {
    let redirect = upstream_response(
        302,
        header_map(&[("location", "http://example.com/next")]),
        b"moved",
    );
    let upstream = Arc::new(
        ScriptedUpstream::new().fail(UpstreamError::with_response(
            "stopped after redirect: REDIRECT!!!",
            redirect,
        )),
    );
    let store = store_with_upstream(upstream);
    store
        .fetch_and_store_response(&get_request("http://example.com/old", &[]), "k", false)
        .await?;

    let header = store.retrieve_response_header("k").await?;
    assert_eq!(header.status, StatusCode::FOUND);
    assert_eq!(
        header.headers.get("location").unwrap(),
        "http://example.com/next"
    );
    Ok(())
}

#[tokio::test]
async fn redirect_signal_without_response_is_transport_error() -> Result<()> {
    let upstream =
        Arc::new(ScriptedUpstream::new().fail(UpstreamError::new("REDIRECT!!! but nothing")));
    let store = store_with_upstream(upstream);
    let err = store
        .fetch_and_store_response(&get_request("http://example.com/", &[]), "k", false)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn upstream_errors_store_nothing() -> Result<()> {
    let failed = upstream_response(500, header_map(&[]), b"boom");
    let upstream = Arc::new(
        ScriptedUpstream::new().fail(UpstreamError::with_response("connection reset", failed)),
    );
    let store = store_with_upstream(upstream);
    let err = store
        .fetch_and_store_response(&get_request("http://example.com/", &[]), "k", false)
        .await
        .unwrap_err();
    match err {
        StoreError::Transport(message) => assert_eq!(message, "connection reset"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.retrieve_response_header("k").await.unwrap_err().is_miss());
    Ok(())
}

#[tokio::test]
async fn write_in_progress_is_returned_from_fetch() -> Result<()> {
    let upstream = Arc::new(ScriptedUpstream::new().respond(200, header_map(&[]), b"body"));
    let store = store_with_upstream(upstream);
    MarkerExclusion::new(store.fs().clone())
        .acquire(&path_for(ResourceClass::Body, &store.digest("k")))
        .await?;

    let err = store
        .fetch_and_store_response(&get_request("http://example.com/", &[]), "k", false)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::WriteInProgress));
    Ok(())
}

#[tokio::test]
async fn fetch_without_client_is_transport_error() -> Result<()> {
    let store = ExchangeStore::memory();
    let err = store
        .fetch_and_store_response(&get_request("http://example.com/", &[]), "k", false)
        .await
        .unwrap_err();
    match err {
        StoreError::Transport(message) => assert_eq!(message, "no upstream client configured"),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn reqwest_client_fetches_from_loopback_upstream() -> Result<()> {
    let upstream = TestUpstream::http_ok("from upstream", "Content-Type: text/plain\r\n").await?;
    let client = ReqwestClient::new(Duration::from_secs(5), false)?;
    let store = ExchangeStore::builder(Arc::new(httpstash::store::MemoryFs::new()))
        .upstream(Arc::new(client))
        .build();

    let request = get_request(&upstream.url("/resource"), &[]);
    store.fetch_and_store_response(&request, "dummy", false).await?;

    let mut response = store.retrieve_response(&upstream.url("/resource")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(read_body(&mut response).await?, b"from upstream");
    Ok(())
}

#[tokio::test]
async fn reqwest_client_reports_closed_connection() -> Result<()> {
    let upstream = TestUpstream::close().await?;
    let client = ReqwestClient::new(Duration::from_secs(5), true)?;
    let store = ExchangeStore::builder(Arc::new(httpstash::store::MemoryFs::new()))
        .upstream(Arc::new(client))
        .build();

    let err = store
        .fetch_and_store_response(&get_request(&upstream.url("/"), &[]), "k", false)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    Ok(())
}
