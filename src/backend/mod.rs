use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AttachResult;
use crate::stream::UploadStream;
use crate::types::{ByteStream, FileId};

mod fs;
mod memory;
mod s3;

pub use fs::FileSystemBackend;
pub use memory::MemoryBackend;
pub use s3::S3Backend;

/// Chunk size for pumping upload sources into storage
pub(crate) const READ_CHUNK: usize = 64 * 1024;

/// Uniform storage contract — every tier satisfies this, and callers
/// above it must not assume durability or latency characteristics of any
/// particular tier.
///
/// All operations are keyed by object id and safe for concurrent use on
/// distinct ids. No operation retries internally; failures propagate to
/// the caller, which owns retry policy.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Persist a source's bytes under a freshly allocated id.
    ///
    /// Commit is atomic: after any failure mid-write the id is either
    /// fully present or fully absent, never partial.
    async fn upload(&self, source: &mut dyn UploadStream) -> AttachResult<FileId>;

    /// Open an object for reading
    async fn get(&self, id: &FileId) -> AttachResult<ByteStream>;

    /// Remove an object. Deleting an absent id is not an error.
    async fn delete(&self, id: &FileId) -> AttachResult<()>;

    /// Whether an object is present
    async fn exists(&self, id: &FileId) -> AttachResult<bool>;

    /// Byte length of a stored object
    async fn size(&self, id: &FileId) -> AttachResult<u64>;

    /// Time-limited direct url to the raw object, for tiers that can
    /// issue one. Local tiers have no direct url and return `None`.
    async fn presigned_url(
        &self,
        _id: &FileId,
        _expires_in: Duration,
    ) -> AttachResult<Option<String>> {
        Ok(None)
    }
}

/// Named backends, resolved by the serving layer from the backend-name
/// segment of an attachment url.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under a name
    pub fn register<S: Into<String>>(mut self, name: S, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(name.into(), backend);
        self
    }

    /// Resolve a backend by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(name).cloned()
    }

    /// Registered backend names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}
