use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::id;

/// Stream of bytes for object content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Unique identifier for one stored object within one backend.
///
/// Opaque, url-safe (`[A-Za-z0-9_-]`), and immutable once assigned. Ids
/// are never reused within a backend's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    /// Allocate a fresh random id
    pub fn generate() -> Self {
        Self(id::generate_id())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record created when a stream is accepted into a backend.
///
/// Never mutated in place: promotion builds a new record bound to a new
/// id in the destination backend. The surrounding application typically
/// persists this as a JSON column next to the owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub id: FileId,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

impl UploadMetadata {
    /// Create a new metadata record
    pub fn new(id: FileId, size: u64) -> Self {
        Self {
            id,
            filename: None,
            content_type: None,
            size,
        }
    }

    /// Set filename
    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set content type
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Serialize for column storage
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from column storage
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
