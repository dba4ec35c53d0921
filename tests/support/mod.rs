#![allow(dead_code)]

pub mod scripted;
pub mod upstream;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use http::{HeaderMap, HeaderValue, Request, StatusCode};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use httpstash::response::Response;
use httpstash::store::{DigestAlgorithm, DiskFs, ExchangeStore, StoreFs};
use httpstash::upstream::UpstreamClient;

pub use scripted::ScriptedUpstream;
pub use upstream::TestUpstream;

pub struct TestDirs {
    _temp: TempDir,
    pub root: PathBuf,
}

impl TestDirs {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().join("store");
        Ok(Self { _temp: temp, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Disk-backed store in a fresh temporary directory. The directory lives as
/// long as the returned [`TestDirs`].
pub async fn disk_store(digest: DigestAlgorithm) -> Result<(TestDirs, ExchangeStore)> {
    let dirs = TestDirs::new()?;
    let fs: Arc<dyn StoreFs> = Arc::new(DiskFs::open(dirs.root()).await?);
    let store = ExchangeStore::builder(fs).digest(digest).build();
    Ok((dirs, store))
}

pub fn store_with_upstream(upstream: Arc<dyn UpstreamClient>) -> ExchangeStore {
    ExchangeStore::builder(Arc::new(httpstash::store::MemoryFs::new()))
        .upstream(upstream)
        .build()
}

pub fn get_request(uri: &str, headers: &[(&'static str, &'static str)]) -> Request<()> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(()).expect("valid test request")
}

pub fn header_map(headers: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(*name, HeaderValue::from_static(value));
    }
    map
}

pub fn response(status: u16, body: &'static [u8], headers: &[(&'static str, &'static str)]) -> Response {
    Response::from_bytes(
        StatusCode::from_u16(status).expect("valid test status"),
        body,
        header_map(headers),
    )
}

pub async fn read_body(response: &mut Response) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    response
        .read_to_end(&mut body)
        .await
        .context("failed to read response body")?;
    Ok(body)
}
