//! Content-addressed storage of HTTP exchanges.
//!
//! Every caller key is digested and each exchange is split across three
//! resource classes (request record, response header record, response body),
//! each at `<class>/v1/<digest>` on a [`StoreFs`]. Writers announce themselves
//! with a `<path>.private` marker; readers that see a live marker report
//! [`StoreError::WriteInProgress`] instead of returning partial content.

pub mod digest;
pub mod error;
mod fetch;
pub mod fs;
pub mod layout;
pub mod marker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use http::{HeaderMap, Request, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::codec;
use crate::logging::{StoreEvent, StoreOperation};
use crate::response::Response;
use crate::upstream::UpstreamClient;

pub use digest::{DigestAlgorithm, UnknownDigest};
pub use error::{Result, StoreError};
pub use fs::{Body, DiskFs, FileMeta, MemoryFs, StoreFs};
pub use layout::ResourceClass;
pub use marker::{MarkerExclusion, WriteExclusion};

use layout::{class_root, is_marker_path, path_for};

/// Status line and headers of a stored response.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHeader {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Describes how one record class is laid out and serialized.
trait RecordClass {
    const CLASS: ResourceClass;
    type Value;

    fn encode(value: &Self::Value) -> Result<Vec<u8>>;
    fn decode(data: &[u8]) -> Result<Self::Value>;
}

struct RequestRecord;

impl RecordClass for RequestRecord {
    const CLASS: ResourceClass = ResourceClass::Request;
    type Value = Request<()>;

    fn encode(value: &Request<()>) -> Result<Vec<u8>> {
        Ok(codec::encode_request(value)?)
    }

    fn decode(data: &[u8]) -> Result<Request<()>> {
        Ok(codec::decode_request(data)?)
    }
}

struct HeaderRecord;

impl RecordClass for HeaderRecord {
    const CLASS: ResourceClass = ResourceClass::Header;
    type Value = StoredHeader;

    fn encode(value: &StoredHeader) -> Result<Vec<u8>> {
        Ok(codec::encode_response_header(value.status, &value.headers))
    }

    fn decode(data: &[u8]) -> Result<StoredHeader> {
        let (status, headers) = codec::decode_response_header(data)?;
        Ok(StoredHeader { status, headers })
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeStore {
    fs: Arc<dyn StoreFs>,
    exclusion: Arc<dyn WriteExclusion>,
    digest: DigestAlgorithm,
    upstream: Option<Arc<dyn UpstreamClient>>,
}

pub struct ExchangeStoreBuilder {
    fs: Arc<dyn StoreFs>,
    exclusion: Option<Arc<dyn WriteExclusion>>,
    digest: DigestAlgorithm,
    upstream: Option<Arc<dyn UpstreamClient>>,
}

impl ExchangeStoreBuilder {
    pub fn digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Defaults to [`MarkerExclusion`] over the store filesystem.
    pub fn exclusion(mut self, exclusion: Arc<dyn WriteExclusion>) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn UpstreamClient>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn build(self) -> ExchangeStore {
        let exclusion = self
            .exclusion
            .unwrap_or_else(|| Arc::new(MarkerExclusion::new(self.fs.clone())));
        ExchangeStore {
            fs: self.fs,
            exclusion,
            digest: self.digest,
            upstream: self.upstream,
        }
    }
}

impl ExchangeStore {
    pub fn builder(fs: Arc<dyn StoreFs>) -> ExchangeStoreBuilder {
        ExchangeStoreBuilder {
            fs,
            exclusion: None,
            digest: DigestAlgorithm::default(),
            upstream: None,
        }
    }

    /// Store backed by process memory.
    pub fn memory() -> Self {
        Self::builder(Arc::new(MemoryFs::new())).build()
    }

    /// Store rooted at `root`, which is created if needed.
    pub async fn disk(root: impl Into<PathBuf>) -> Result<Self> {
        let fs = DiskFs::open(root).await?;
        Ok(Self::builder(Arc::new(fs)).build())
    }

    pub fn digest(&self, key: &str) -> String {
        self.digest.digest(key)
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn fs(&self) -> &Arc<dyn StoreFs> {
        &self.fs
    }

    pub(crate) fn upstream(&self) -> Option<&Arc<dyn UpstreamClient>> {
        self.upstream.as_ref()
    }

    // Requests

    pub async fn store_request(
        &self,
        request: &Request<()>,
        key: &str,
        overwrite: bool,
    ) -> Result<()> {
        tracing::debug!(key, overwrite, "storing request");
        self.store_record::<RequestRecord>(request, &self.digest(key), overwrite)
            .await
    }

    pub async fn retrieve_request(&self, key: &str) -> Result<Request<()>> {
        tracing::debug!(key, "retrieving request");
        self.retrieve_request_by_digest(&self.digest(key)).await
    }

    pub async fn retrieve_request_by_digest(&self, digest: &str) -> Result<Request<()>> {
        self.retrieve_request_by_path(&path_for(ResourceClass::Request, digest))
            .await
    }

    /// Reads a request record at an arbitrary store path, such as one
    /// returned by [`ExchangeStore::walk_requests`].
    pub async fn retrieve_request_by_path(&self, path: &str) -> Result<Request<()>> {
        let started = Instant::now();
        let result = self.read_record::<RequestRecord>(path).await;
        observe(
            StoreEvent::new(StoreOperation::Retrieve, ResourceClass::Request, path),
            started,
            &result,
        );
        result
    }

    pub async fn delete_request(&self, key: &str) -> Result<()> {
        self.delete_class(ResourceClass::Request, key).await
    }

    /// Request record paths (markers and directories excluded) with their
    /// metadata. A store that never held a request yields empty lists.
    pub async fn walk_requests(&self) -> Result<(Vec<FileMeta>, Vec<String>)> {
        let entries = match self.fs.walk(&class_root(ResourceClass::Request)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(entries
            .into_iter()
            .filter(|(path, meta)| !meta.is_dir && !is_marker_path(path))
            .map(|(path, meta)| (meta, path))
            .unzip())
    }

    /// Every request record that decodes. Unreadable records are skipped.
    pub async fn retrieve_all_requests(&self) -> Result<Vec<Request<()>>> {
        let (_, paths) = self.walk_requests().await?;
        let mut requests = Vec::with_capacity(paths.len());
        for path in paths {
            match self.retrieve_request_by_path(&path).await {
                Ok(request) => requests.push(request),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "skipping unreadable request record");
                }
            }
        }
        Ok(requests)
    }

    // Responses

    /// Stores the body, then the header. The body is read from the current
    /// position of `response` to its end.
    pub async fn store_response(
        &self,
        response: &mut Response,
        key: &str,
        overwrite: bool,
    ) -> Result<()> {
        tracing::debug!(key, overwrite, status = %response.status(), "storing response");
        self.store_response_body(response, key, overwrite).await?;
        self.store_response_header(response, key, overwrite).await
    }

    pub async fn store_response_header(
        &self,
        response: &Response,
        key: &str,
        overwrite: bool,
    ) -> Result<()> {
        let header = StoredHeader {
            status: response.status(),
            headers: response.headers().clone(),
        };
        self.store_record::<HeaderRecord>(&header, &self.digest(key), overwrite)
            .await
    }

    pub async fn store_response_body<R>(&self, body: &mut R, key: &str, overwrite: bool) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let digest = self.digest(key);
        let started = Instant::now();
        let result = self
            .write_content(ResourceClass::Body, &digest, body, overwrite)
            .await;
        let event = StoreEvent::new(StoreOperation::Store, ResourceClass::Body, digest)
            .overwrite(overwrite);
        let event = match &result {
            Ok(written) => event.bytes(*written),
            Err(_) => event,
        };
        observe(event, started, &result);
        result.map(|_| ())
    }

    /// Opens the stored body and pairs it with the stored header. The body
    /// handle moves into the returned [`Response`].
    pub async fn retrieve_response(&self, key: &str) -> Result<Response> {
        tracing::debug!(key, "retrieving response");
        let digest = self.digest(key);
        let started = Instant::now();
        let result = self.open_content(&path_for(ResourceClass::Body, &digest)).await;
        let event = StoreEvent::new(StoreOperation::Retrieve, ResourceClass::Body, digest.as_str());
        let event = match &result {
            Ok((_, meta)) => event.bytes(meta.len),
            Err(_) => event,
        };
        observe(event, started, &result);
        let (body, _) = result?;

        // On failure `body` is dropped here, closing the handle.
        let header = self.retrieve_response_header_by_digest(&digest).await?;
        Ok(Response::new(header.status, body, header.headers))
    }

    pub async fn retrieve_response_header(&self, key: &str) -> Result<StoredHeader> {
        self.retrieve_response_header_by_digest(&self.digest(key))
            .await
    }

    pub async fn retrieve_response_header_by_digest(&self, digest: &str) -> Result<StoredHeader> {
        let started = Instant::now();
        let result = self
            .read_record::<HeaderRecord>(&path_for(ResourceClass::Header, digest))
            .await;
        observe(
            StoreEvent::new(StoreOperation::Retrieve, ResourceClass::Header, digest),
            started,
            &result,
        );
        result
    }

    /// Removes the body, then the header. The first failure stops the
    /// sequence.
    pub async fn delete_response(&self, key: &str) -> Result<()> {
        self.delete_response_body(key).await?;
        self.delete_response_header(key).await
    }

    pub async fn delete_response_header(&self, key: &str) -> Result<()> {
        self.delete_class(ResourceClass::Header, key).await
    }

    pub async fn delete_response_body(&self, key: &str) -> Result<()> {
        self.delete_class(ResourceClass::Body, key).await
    }

    /// Removes whatever lives at `path`. A missing path is
    /// [`StoreError::NotFound`].
    pub async fn delete_by_path(&self, path: &str) -> Result<()> {
        self.fs.remove(path).await.map_err(StoreError::from_open)
    }

    // Generic record plumbing

    async fn store_record<C: RecordClass>(
        &self,
        value: &C::Value,
        digest: &str,
        overwrite: bool,
    ) -> Result<()> {
        let started = Instant::now();
        let result = match C::encode(value) {
            Ok(encoded) => {
                self.write_content(C::CLASS, digest, &mut encoded.as_slice(), overwrite)
                    .await
            }
            Err(err) => Err(err),
        };
        let event = StoreEvent::new(StoreOperation::Store, C::CLASS, digest).overwrite(overwrite);
        let event = match &result {
            Ok(written) => event.bytes(*written),
            Err(_) => event,
        };
        observe(event, started, &result);
        result.map(|_| ())
    }

    async fn read_record<C: RecordClass>(&self, path: &str) -> Result<C::Value> {
        let (mut content, meta) = self.open_content(path).await?;
        let mut data = Vec::with_capacity(usize::try_from(meta.len).unwrap_or_default());
        content.read_to_end(&mut data).await?;
        C::decode(&data)
    }

    /// Write protocol shared by all classes: check, mark, write, unmark.
    /// Returns the number of bytes written.
    async fn write_content<R>(
        &self,
        class: ResourceClass,
        digest: &str,
        content: &mut R,
        overwrite: bool,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let path = path_for(class, digest);
        if !overwrite {
            if self.exclusion.is_held(&path).await {
                return Err(StoreError::WriteInProgress);
            }
            if let Ok(meta) = self.fs.metadata(&path).await
                && !meta.is_dir
                && meta.len > 0
            {
                return Err(StoreError::AlreadyStored);
            }
        }

        self.exclusion.acquire(&path).await?;

        // A failure from here on leaves the marker in place.
        self.fs.create_dir_all(&fs::parent_path(&path)).await?;
        let mut writer = self.fs.open_write(&path, true).await?;
        let written = tokio::io::copy(content, &mut writer).await?;
        writer.shutdown().await?;
        drop(writer);

        if let Err(err) = self.exclusion.release(&path).await {
            tracing::warn!(path = %path, error = %err, "failed to release write marker");
        }
        Ok(written)
    }

    /// Read protocol shared by all classes: marker, open, then size.
    async fn open_content(&self, path: &str) -> Result<(Body, FileMeta)> {
        if self.exclusion.is_held(path).await {
            return Err(StoreError::WriteInProgress);
        }
        let content = self.fs.open_read(path).await.map_err(StoreError::from_open)?;
        let meta = self.fs.metadata(path).await.map_err(StoreError::from_open)?;
        if meta.len == 0 {
            return Err(StoreError::FoundEmpty);
        }
        Ok((content, meta))
    }

    async fn delete_class(&self, class: ResourceClass, key: &str) -> Result<()> {
        let digest = self.digest(key);
        let path = path_for(class, &digest);
        let started = Instant::now();
        let result = self.delete_by_path(&path).await;
        if result.is_ok()
            && let Err(err) = self.exclusion.release(&path).await
        {
            tracing::debug!(path = %path, error = %err, "leftover write marker not removed");
        }
        observe(
            StoreEvent::new(StoreOperation::Delete, class, digest),
            started,
            &result,
        );
        result
    }
}

fn observe<T>(event: StoreEvent, started: Instant, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    event.outcome(outcome).elapsed(started.elapsed()).log();
}
