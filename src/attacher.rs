use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::backend::Backend;
use crate::config::AttachConfig;
use crate::error::{AttachError, AttachResult};
use crate::meta::{extract_content_type, extract_filename};
use crate::stream::{verify_upload, StreamUpload, UploadStream};
use crate::types::{FileId, UploadMetadata};
use crate::url::{UrlBuilder, UrlOptions};

/// Which tier currently owns an attachment's bytes.
///
/// `stored` is terminal for a given upload; a new upload always restarts
/// the lifecycle at `cached`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentState {
    Empty,
    Cached(UploadMetadata),
    Stored(UploadMetadata),
}

impl AttachmentState {
    /// Metadata of the live copy, if any
    pub fn metadata(&self) -> Option<&UploadMetadata> {
        match self {
            AttachmentState::Empty => None,
            AttachmentState::Cached(meta) | AttachmentState::Stored(meta) => Some(meta),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AttachmentState::Empty)
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, AttachmentState::Cached(_))
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, AttachmentState::Stored(_))
    }
}

/// Lifecycle orchestrator for one attachment slot.
///
/// Freshly uploaded streams land in the cache tier; `promote` moves them
/// into the store tier once the application has validated or processed
/// them. At most one copy is live at a time from the attachment's point
/// of view.
pub struct Attacher {
    name: String,
    cache: Arc<dyn Backend>,
    store: Arc<dyn Backend>,
    cache_name: String,
    store_name: String,
    config: AttachConfig,
    state: AttachmentState,
}

impl Attacher {
    /// Create an attacher over a cache and a store tier.
    ///
    /// `name` is the attachment slot's declared name (for example
    /// `document`); urls fall back to it when no filename is known.
    pub fn new<S: Into<String>>(
        name: S,
        cache: Arc<dyn Backend>,
        store: Arc<dyn Backend>,
        config: AttachConfig,
    ) -> Self {
        Self {
            name: name.into(),
            cache,
            store,
            cache_name: "cache".to_string(),
            store_name: "store".to_string(),
            config,
            state: AttachmentState::Empty,
        }
    }

    /// Use registry names other than the default `cache`/`store`
    pub fn with_backend_names<C, S>(mut self, cache_name: C, store_name: S) -> Self
    where
        C: Into<String>,
        S: Into<String>,
    {
        self.cache_name = cache_name.into();
        self.store_name = store_name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &AttachmentState {
        &self.state
    }

    pub fn config(&self) -> &AttachConfig {
        &self.config
    }

    /// Metadata of the live copy, if any
    pub fn metadata(&self) -> Option<&UploadMetadata> {
        self.state.metadata()
    }

    /// Id of the cached copy, while one exists
    pub fn cache_id(&self) -> Option<&FileId> {
        match &self.state {
            AttachmentState::Cached(meta) => Some(&meta.id),
            _ => None,
        }
    }

    /// Id of the stored copy, while one exists
    pub fn store_id(&self) -> Option<&FileId> {
        match &self.state {
            AttachmentState::Stored(meta) => Some(&meta.id),
            _ => None,
        }
    }

    /// Registry name of the backend owning the live copy
    pub fn backend_name(&self) -> Option<&str> {
        match &self.state {
            AttachmentState::Empty => None,
            AttachmentState::Cached(_) => Some(&self.cache_name),
            AttachmentState::Stored(_) => Some(&self.store_name),
        }
    }

    /// Accept an upload into the cache tier.
    ///
    /// The source is validated against the configured size ceiling,
    /// streamed into the cache backend, and closed on every exit path,
    /// including rejection. The recorded size is read back from the
    /// backend, so it reflects the bytes actually delivered. Accepting
    /// over an existing cached upload replaces it; accepting over a
    /// stored one restarts the lifecycle without touching the stored
    /// object.
    #[instrument(skip(self, source), fields(attachment = %self.name))]
    pub async fn accept<S: UploadStream>(&mut self, mut source: S) -> AttachResult<UploadMetadata> {
        if let Err(err) = verify_upload(&source, self.config.max_upload_bytes) {
            let _ = source.close().await;
            return Err(err);
        }

        let filename = extract_filename(&source);
        let content_type = extract_content_type(&source);

        let uploaded = self.cache.upload(&mut source).await;
        let closed = source.close().await;
        let id = uploaded?;
        closed?;

        let size = self.cache.size(&id).await?;

        if let AttachmentState::Cached(old) = &self.state {
            if let Err(err) = self.cache.delete(&old.id).await {
                warn!(id = %old.id, error = %err, "failed to delete replaced cache object");
            }
        }

        let mut meta = UploadMetadata::new(id, size);
        if let Some(filename) = filename {
            meta = meta.with_filename(filename);
        }
        if let Some(content_type) = content_type {
            meta = meta.with_content_type(content_type);
        }

        debug!(id = %meta.id, size = meta.size, "upload cached");
        self.state = AttachmentState::Cached(meta.clone());
        Ok(meta)
    }

    /// Move the cached upload into permanent storage.
    ///
    /// Bytes are streamed from the cache backend without re-validation.
    /// The cache copy is deleted only after the store copy is confirmed
    /// present, so a crash in between leaves a re-runnable state rather
    /// than a lost upload.
    #[instrument(skip(self), fields(attachment = %self.name))]
    pub async fn promote(&mut self) -> AttachResult<UploadMetadata> {
        let cached = match &self.state {
            AttachmentState::Cached(meta) => meta.clone(),
            AttachmentState::Empty | AttachmentState::Stored(_) => {
                return Err(AttachError::invalid("no cached upload to promote"));
            }
        };

        let body = self.cache.get(&cached.id).await?;
        let mut transfer = StreamUpload::new(body, cached.size);
        let stored_id = self.store.upload(&mut transfer).await?;

        if !self.store.exists(&stored_id).await? {
            return Err(AttachError::backend_msg(format!(
                "promoted object {stored_id} is not visible in the store backend"
            )));
        }
        self.cache.delete(&cached.id).await?;

        let meta = UploadMetadata {
            id: stored_id,
            filename: cached.filename,
            content_type: cached.content_type,
            size: cached.size,
        };
        info!(id = %meta.id, "upload promoted to store");
        self.state = AttachmentState::Stored(meta.clone());
        Ok(meta)
    }

    /// Delete whichever copy is live.
    ///
    /// Idempotent: removing an empty slot is a no-op.
    #[instrument(skip(self), fields(attachment = %self.name))]
    pub async fn remove(&mut self) -> AttachResult<()> {
        match &self.state {
            AttachmentState::Empty => return Ok(()),
            AttachmentState::Cached(meta) => self.cache.delete(&meta.id).await?,
            AttachmentState::Stored(meta) => self.store.delete(&meta.id).await?,
        }
        debug!("attachment removed");
        self.state = AttachmentState::Empty;
        Ok(())
    }

    /// Public url for the live copy, or `None` while the slot is empty
    pub fn url(&self, options: &UrlOptions) -> Option<String> {
        UrlBuilder::new(&self.config).attachment_url(self, options)
    }
}
