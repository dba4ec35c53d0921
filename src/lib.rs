pub mod cli;
pub mod codec;
pub mod logging;
pub mod metrics;
pub mod response;
pub mod settings;
pub mod store;
pub mod upstream;

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use http::{HeaderMap, Method, Request};
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;

use crate::{
    cli::Command,
    settings::{Backend, Settings},
    store::{DiskFs, ExchangeStore, MemoryFs, StoreError, StoreFs},
    upstream::ReqwestClient,
};

pub async fn run(settings: Settings, command: Command) -> Result<()> {
    let store = build_store(&settings).await?;
    match command {
        Command::Fetch {
            url,
            key,
            overwrite,
        } => {
            let request = Request::builder()
                .method(Method::GET)
                .uri(url.as_str())
                .body(())
                .with_context(|| format!("invalid URL '{url}'"))?;
            let key = key.unwrap_or(url);
            let request_outcome = outcome(
                store.store_request(&request, &key, overwrite).await,
                "stored",
            )?;
            let response_outcome = outcome(
                store
                    .fetch_and_store_response(&request, &key, overwrite)
                    .await,
                "stored",
            )?;
            print_json(&json!({
                "key": key,
                "digest": store.digest(&key),
                "request": request_outcome,
                "response": response_outcome,
            }))
        }
        Command::Request { key } => {
            let request = store
                .retrieve_request(&key)
                .await
                .with_context(|| format!("failed to retrieve request for '{key}'"))?;
            print_json(&json!({
                "method": request.method().as_str(),
                "uri": request.uri().to_string(),
                "version": format!("{:?}", request.version()),
                "headers": headers_json(request.headers()),
            }))
        }
        Command::Response { key, body } => {
            if body {
                let response = store
                    .retrieve_response(&key)
                    .await
                    .with_context(|| format!("failed to retrieve response for '{key}'"))?;
                let mut body = response.into_body();
                let mut stdout = tokio::io::stdout();
                tokio::io::copy(&mut body, &mut stdout).await?;
                stdout.flush().await?;
                Ok(())
            } else {
                let header = store
                    .retrieve_response_header(&key)
                    .await
                    .with_context(|| format!("failed to retrieve response header for '{key}'"))?;
                print_json(&json!({
                    "status": header.status.as_u16(),
                    "headers": headers_json(&header.headers),
                }))
            }
        }
        Command::List => {
            let (metas, paths) = store.walk_requests().await?;
            let entries: Vec<Value> = metas
                .iter()
                .zip(&paths)
                .map(|(meta, path)| {
                    let modified = meta
                        .modified
                        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                        .map(|since| since.as_secs());
                    json!({ "path": path, "len": meta.len, "modified": modified })
                })
                .collect();
            print_json(&Value::Array(entries))
        }
        Command::Delete { key } => {
            let request_outcome = outcome(store.delete_request(&key).await, "deleted")?;
            let response_outcome = outcome(store.delete_response(&key).await, "deleted")?;
            print_json(&json!({
                "key": key,
                "request": request_outcome,
                "response": response_outcome,
            }))
        }
        Command::Digest { key } => {
            println!("{}", store.digest(&key));
            Ok(())
        }
    }
}

pub async fn build_store(settings: &Settings) -> Result<ExchangeStore> {
    let fs: Arc<dyn StoreFs> = match settings.backend {
        Backend::Memory => Arc::new(MemoryFs::new()),
        Backend::Disk => Arc::new(DiskFs::open(&settings.root).await.with_context(|| {
            format!("failed to open store root {}", settings.root.display())
        })?),
    };
    let upstream = ReqwestClient::new(settings.upstream_timeout(), settings.follow_redirects)?;
    tracing::debug!(
        backend = ?settings.backend,
        digest = %settings.digest,
        "store ready"
    );
    Ok(ExchangeStore::builder(fs)
        .digest(settings.digest_algorithm()?)
        .upstream(Arc::new(upstream))
        .build())
}

/// Cache-style outcomes are reported, not failed on.
fn outcome(result: store::Result<()>, success: &'static str) -> Result<&'static str> {
    match result {
        Ok(()) => Ok(success),
        Err(err @ (StoreError::AlreadyStored
        | StoreError::WriteInProgress
        | StoreError::NotFound
        | StoreError::FoundEmpty)) => Ok(err.kind()),
        Err(err) => Err(err.into()),
    }
}

fn headers_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        map.insert(codec::canonical_header_name(name.as_str()), Value::Array(values));
    }
    Value::Object(map)
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
