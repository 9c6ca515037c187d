//! # dog-attach: Two-tier file attachment lifecycle
//!
//! `dog-attach` moves uploaded files through the classic two-tier pipeline for
//! DogRS applications: a temporary **cache** tier receives freshly uploaded
//! streams, and a permanent **store** tier receives them once the application
//! has validated or processed them. Urls for either tier are deterministic,
//! reversible, and optionally signed.
//!
//! ## Key Features
//!
//! - **Streaming-first**: uploads are pumped chunk by chunk, never held whole
//!   in memory by the pipeline itself
//! - **Storage agnostic**: one backend contract over memory, local
//!   filesystem, and S3-compatible stores; adding a tier never touches callers
//! - **Validated intake**: size ceilings and capability checks run before a
//!   single byte is persisted
//! - **Deterministic urls**: `[host][/prefix]/<backend>/<id>/<filename>` built
//!   from the metadata record alone, with optional HMAC signing
//! - **Server agnostic**: no HTTP coupling - works with any protocol
//!   (HTTP, gRPC, CLI, background jobs)
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_attach::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> AttachResult<()> {
//! let cache = Arc::new(MemoryBackend::new());
//! let store = Arc::new(MemoryBackend::new());
//! let config = AttachConfig::new().with_max_upload_bytes(10 * 1024 * 1024);
//!
//! let mut attacher = Attacher::new("document", cache, store, config);
//!
//! // Accept a fresh upload into the cache tier.
//! let upload = MemoryUpload::new(&b"hello"[..]).with_filename("hello.txt");
//! attacher.accept(upload).await?;
//!
//! // Promote it into permanent storage once it has been processed.
//! attacher.promote().await?;
//!
//! // Deterministic public url for the stored object.
//! let url = attacher.url(&UrlOptions::new());
//! assert!(url.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Your Service   │  ← decides when to promote or remove
//! ├──────────────────┤
//! │     Attacher     │  ← lifecycle: empty → cached → stored → empty
//! ├──────────────────┤
//! │     Backend      │  ← storage primitives (memory / fs / s3)
//! └──────────────────┘
//! ```
//!
//! The serving half is just as thin: resolve the backend name from the url
//! path via [`BackendRegistry`], verify the signature with [`Signer`] when
//! one is configured, and stream [`Backend::get`] back out.

pub mod attacher;
pub mod backend;
mod config;
mod error;
mod id;
mod meta;
mod sign;
pub mod stream;
mod types;
mod url;

// Re-export main types for clean API
pub use attacher::{Attacher, AttachmentState};
pub use backend::{Backend, BackendRegistry, FileSystemBackend, MemoryBackend, S3Backend};
pub use config::AttachConfig;
pub use error::{AttachError, AttachResult};
pub use meta::{content_type_for, extension_for, extract_content_type, extract_filename};
pub use sign::Signer;
pub use stream::{
    verify_upload, verify_uploadable, CheckedUpload, FileUpload, MemoryUpload, RawUpload,
    StreamUpload, UploadInfo, UploadStream,
};
pub use types::{ByteStream, FileId, UploadMetadata};
pub use url::{parse_attachment_path, UrlBuilder, UrlOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AttachConfig, AttachError, AttachResult, Attacher, Backend, BackendRegistry, FileId,
        MemoryBackend, MemoryUpload, UploadMetadata, UploadStream, UrlOptions,
    };
}
