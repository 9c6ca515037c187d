use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

use crate::backend::{Backend, READ_CHUNK};
use crate::error::{AttachError, AttachResult};
use crate::stream::UploadStream;
use crate::types::{ByteStream, FileId};

/// In-memory backend for testing and development.
///
/// Contents live for the process lifetime only.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<FileId, Bytes>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn upload(&self, source: &mut dyn UploadStream) -> AttachResult<FileId> {
        let mut buf = BytesMut::new();
        while !source.eof() {
            let chunk = source.read(READ_CHUNK).await?;
            if chunk.is_empty() {
                break;
            }
            buf.extend_from_slice(&chunk);
        }

        let id = FileId::generate();
        self.objects.write().insert(id.clone(), buf.freeze());
        Ok(id)
    }

    async fn get(&self, id: &FileId) -> AttachResult<ByteStream> {
        let data = self
            .objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AttachError::not_found(id.as_str()))?;
        Ok(Box::pin(futures_util::stream::once(async move {
            Ok::<Bytes, std::io::Error>(data)
        })))
    }

    async fn delete(&self, id: &FileId) -> AttachResult<()> {
        self.objects.write().remove(id);
        Ok(())
    }

    async fn exists(&self, id: &FileId) -> AttachResult<bool> {
        Ok(self.objects.read().contains_key(id))
    }

    async fn size(&self, id: &FileId) -> AttachResult<u64> {
        self.objects
            .read()
            .get(id)
            .map(|data| data.len() as u64)
            .ok_or_else(|| AttachError::not_found(id.as_str()))
    }
}
