use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncReadExt;

use crate::error::{AttachError, AttachResult};
use crate::types::ByteStream;

/// Metadata hooks an upload source may provide.
///
/// Every hook defaults to `None`; sources override the ones they can
/// answer. Filename and content-type inference builds on these.
pub trait UploadInfo {
    /// Filename declared by whoever produced the upload
    fn original_filename(&self) -> Option<&str> {
        None
    }

    /// Path of the source on disk, when it has one
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Content type declared by whoever produced the upload
    fn content_type(&self) -> Option<&str> {
        None
    }
}

/// Capability contract any upload source must satisfy.
///
/// Statically implemented sources carry the full contract by
/// construction; values assembled at dynamic boundaries go through
/// [`RawUpload`] and [`verify_uploadable`] instead.
#[async_trait]
pub trait UploadStream: UploadInfo + Send {
    /// Total number of bytes this source will deliver
    fn size(&self) -> u64;

    /// Read up to `n` bytes. An empty chunk signals end of input.
    async fn read(&mut self, n: usize) -> io::Result<Bytes>;

    /// True once the source is exhausted
    fn eof(&self) -> bool;

    /// Release underlying resources. Safe to call more than once.
    async fn close(&mut self) -> io::Result<()>;
}

/// Validate a typed upload source against a size ceiling.
///
/// Only `size` is consulted; no bytes are read. Exceeding the ceiling is
/// an expected rejection, not a fault.
pub fn verify_upload<S: UploadStream + ?Sized>(
    source: &S,
    max_size: Option<u64>,
) -> AttachResult<()> {
    check_size(source.size(), max_size)
}

fn check_size(size: u64, max_size: Option<u64>) -> AttachResult<()> {
    if let Some(max) = max_size {
        if size > max {
            return Err(AttachError::invalid(format!(
                "upload of {size} bytes exceeds the {max} byte limit"
            )));
        }
    }
    Ok(())
}

/// Close hook for a [`RawUpload`]
pub type CloseFn = Box<dyn FnOnce() + Send>;

/// An upload assembled at a dynamic boundary — a multipart field, a
/// deserialized job payload — where the type system cannot guarantee the
/// stream capabilities. One slot per capability; [`verify_uploadable`]
/// checks them all before the value is admitted.
#[derive(Default)]
pub struct RawUpload {
    pub size: Option<u64>,
    pub read: Option<ByteStream>,
    pub eof: Option<bool>,
    pub close: Option<CloseFn>,
}

impl RawUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_read(mut self, body: ByteStream) -> Self {
        self.read = Some(body);
        self
    }

    pub fn with_eof(mut self, eof: bool) -> Self {
        self.eof = Some(eof);
        self
    }

    pub fn with_close<F: FnOnce() + Send + 'static>(mut self, close: F) -> Self {
        self.close = Some(Box::new(close));
        self
    }

    /// Convert a verified upload into a typed stream.
    ///
    /// Missing capabilities surface as the same contract errors
    /// [`verify_uploadable`] reports.
    pub fn into_stream(self) -> AttachResult<CheckedUpload> {
        let size = self.size.ok_or_else(|| AttachError::contract("size"))?;
        let body = self.read.ok_or_else(|| AttachError::contract("read"))?;
        let eof = self.eof.ok_or_else(|| AttachError::contract("eof"))?;
        let close = self.close.ok_or_else(|| AttachError::contract("close"))?;

        let mut inner = StreamUpload::new(body, size);
        inner.done = eof;
        Ok(CheckedUpload {
            inner,
            close: Some(close),
        })
    }
}

/// Verify that a dynamically assembled upload satisfies the capability
/// contract and the size policy.
///
/// A missing capability is a caller bug (`ContractViolation`); an
/// oversized upload is an expected rejection (`Invalid`). Nothing is
/// read from the source either way.
pub fn verify_uploadable(upload: &RawUpload, max_size: Option<u64>) -> AttachResult<()> {
    let size = upload.size.ok_or_else(|| AttachError::contract("size"))?;
    if upload.read.is_none() {
        return Err(AttachError::contract("read"));
    }
    if upload.eof.is_none() {
        return Err(AttachError::contract("eof"));
    }
    if upload.close.is_none() {
        return Err(AttachError::contract("close"));
    }
    check_size(size, max_size)
}

/// A dynamically assembled upload whose capabilities have been verified
pub struct CheckedUpload {
    inner: StreamUpload,
    close: Option<CloseFn>,
}

impl UploadInfo for CheckedUpload {}

#[async_trait]
impl UploadStream for CheckedUpload {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    async fn read(&mut self, n: usize) -> io::Result<Bytes> {
        self.inner.read(n).await
    }

    fn eof(&self) -> bool {
        self.inner.eof()
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(close) = self.close.take() {
            close();
        }
        self.inner.close().await
    }
}

/// In-memory upload source.
///
/// The workhorse for tests and for accepting bytes that are already in
/// memory. Filename and content type ride along via the builders.
#[derive(Debug, Clone)]
pub struct MemoryUpload {
    data: Bytes,
    pos: usize,
    filename: Option<String>,
    content_type: Option<String>,
}

impl MemoryUpload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            filename: None,
            content_type: None,
        }
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl UploadInfo for MemoryUpload {
    fn original_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[async_trait]
impl UploadStream for MemoryUpload {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read(&mut self, n: usize) -> io::Result<Bytes> {
        let end = (self.pos + n).min(self.data.len());
        let chunk = self.data.slice(self.pos..end);
        self.pos = end;
        Ok(chunk)
    }

    fn eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.pos = self.data.len();
        Ok(())
    }
}

/// Upload source backed by a file on disk
pub struct FileUpload {
    file: tokio::fs::File,
    path: PathBuf,
    size: u64,
    read_bytes: u64,
    content_type: Option<String>,
}

impl FileUpload {
    /// Open `path` for uploading. Size comes from filesystem metadata;
    /// the filename is inferred from the path.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        Ok(Self {
            file,
            path,
            size,
            read_bytes: 0,
            content_type: None,
        })
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl UploadInfo for FileUpload {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[async_trait]
impl UploadStream for FileUpload {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read(&mut self, n: usize) -> io::Result<Bytes> {
        let want = n.min((self.size - self.read_bytes) as usize);
        if want == 0 {
            return Ok(Bytes::new());
        }
        let mut buf = vec![0u8; want];
        let got = self.file.read(&mut buf).await?;
        if got == 0 {
            // file shrank under us; treat as exhausted
            self.read_bytes = self.size;
            return Ok(Bytes::new());
        }
        buf.truncate(got);
        self.read_bytes += got as u64;
        Ok(Bytes::from(buf))
    }

    fn eof(&self) -> bool {
        self.read_bytes >= self.size
    }

    async fn close(&mut self) -> io::Result<()> {
        // the descriptor is released when the handle drops
        self.read_bytes = self.size;
        Ok(())
    }
}

/// Bridges a backend read stream into the upload contract, so bytes can
/// be pumped between backends without re-validation.
pub struct StreamUpload {
    size: u64,
    body: ByteStream,
    pending: Bytes,
    done: bool,
}

impl StreamUpload {
    pub fn new(body: ByteStream, size: u64) -> Self {
        Self {
            size,
            body,
            pending: Bytes::new(),
            done: false,
        }
    }
}

impl UploadInfo for StreamUpload {}

#[async_trait]
impl UploadStream for StreamUpload {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read(&mut self, n: usize) -> io::Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        while self.pending.is_empty() && !self.done {
            match self.body.next().await {
                Some(chunk) => self.pending = chunk?,
                None => self.done = true,
            }
        }
        if self.pending.is_empty() {
            return Ok(Bytes::new());
        }
        let take = n.min(self.pending.len());
        Ok(self.pending.split_to(take))
    }

    fn eof(&self) -> bool {
        self.done && self.pending.is_empty()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.done = true;
        self.pending = Bytes::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    fn body_of(data: &'static [u8]) -> ByteStream {
        Box::pin(futures_util::stream::once(async move {
            Ok(Bytes::from_static(data))
        }))
    }

    fn complete_raw() -> RawUpload {
        RawUpload::new()
            .with_size(5)
            .with_read(body_of(b"hello"))
            .with_eof(false)
            .with_close(|| {})
    }

    #[test]
    fn accepts_a_complete_upload() {
        assert!(verify_uploadable(&complete_raw(), None).is_ok());
    }

    #[test]
    fn rejects_a_missing_size() {
        let raw = RawUpload::new()
            .with_read(body_of(b"hello"))
            .with_eof(false)
            .with_close(|| {});
        let err = verify_uploadable(&raw, None).unwrap_err();
        assert!(matches!(
            err,
            AttachError::ContractViolation { capability: "size" }
        ));
    }

    #[test]
    fn rejects_a_missing_read() {
        let raw = RawUpload::new().with_size(5).with_eof(false).with_close(|| {});
        let err = verify_uploadable(&raw, None).unwrap_err();
        assert!(matches!(
            err,
            AttachError::ContractViolation { capability: "read" }
        ));
    }

    #[test]
    fn rejects_a_missing_eof() {
        let raw = RawUpload::new()
            .with_size(5)
            .with_read(body_of(b"hello"))
            .with_close(|| {});
        let err = verify_uploadable(&raw, None).unwrap_err();
        assert!(matches!(
            err,
            AttachError::ContractViolation { capability: "eof" }
        ));
    }

    #[test]
    fn rejects_a_missing_close() {
        let raw = RawUpload::new()
            .with_size(5)
            .with_read(body_of(b"hello"))
            .with_eof(false);
        let err = verify_uploadable(&raw, None).unwrap_err();
        assert!(matches!(
            err,
            AttachError::ContractViolation { capability: "close" }
        ));
    }

    #[test]
    fn accepts_when_size_is_within_the_ceiling() {
        assert!(verify_uploadable(&complete_raw(), Some(8)).is_ok());
    }

    #[test]
    fn rejects_when_size_exceeds_the_ceiling() {
        let raw = RawUpload::new()
            .with_size(11)
            .with_read(body_of(b"hello world"))
            .with_eof(false)
            .with_close(|| {});
        let err = verify_uploadable(&raw, Some(8)).unwrap_err();
        assert!(matches!(err, AttachError::Invalid { .. }));
    }

    #[test]
    fn typed_sources_only_get_the_policy_check() {
        let small = MemoryUpload::new(&b"hello"[..]);
        assert!(verify_upload(&small, Some(8)).is_ok());

        let big = MemoryUpload::new(&b"hello world"[..]);
        let err = verify_upload(&big, Some(8)).unwrap_err();
        assert!(matches!(err, AttachError::Invalid { .. }));
    }

    #[tokio::test]
    async fn memory_upload_reads_to_eof() {
        let mut upload = MemoryUpload::new(&b"hello world"[..]);
        assert_eq!(upload.size(), 11);
        assert!(!upload.eof());

        let first = upload.read(5).await.unwrap();
        assert_eq!(&first[..], b"hello");
        let rest = upload.read(64).await.unwrap();
        assert_eq!(&rest[..], b" world");
        assert!(upload.eof());
        assert!(upload.read(64).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checked_upload_runs_its_close_hook() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();

        let mut stream = complete_raw()
            .with_close(move || flag.store(true, Ordering::SeqCst))
            .into_stream()
            .unwrap();

        let chunk = stream.read(64).await.unwrap();
        assert_eq!(&chunk[..], b"hello");
        stream.close().await.unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stream_upload_delivers_buffered_chunks() {
        let mut upload = StreamUpload::new(body_of(b"hello world"), 11);
        let first = upload.read(5).await.unwrap();
        assert_eq!(&first[..], b"hello");
        assert!(!upload.eof());

        let rest = upload.read(64).await.unwrap();
        assert_eq!(&rest[..], b" world");
        assert!(upload.read(64).await.unwrap().is_empty());
        assert!(upload.eof());
    }

    #[tokio::test]
    async fn file_upload_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let mut upload = FileUpload::open(&path).await.unwrap();
        assert_eq!(upload.size(), 11);
        assert_eq!(upload.path().unwrap(), path.as_path());

        let mut collected = Vec::new();
        while !upload.eof() {
            let chunk = upload.read(4).await.unwrap();
            if chunk.is_empty() {
                break;
            }
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"hello world");
        upload.close().await.unwrap();
    }
}
