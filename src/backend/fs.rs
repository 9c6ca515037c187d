use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::backend::{Backend, READ_CHUNK};
use crate::error::{AttachError, AttachResult};
use crate::stream::UploadStream;
use crate::types::{ByteStream, FileId};

/// Durable single-node backend rooted at a directory.
///
/// Ids map to flat files under the root. Writes go to a scratch area and
/// are renamed into place, so a failed upload never leaves a partial
/// object under its final id.
pub struct FileSystemBackend {
    root: PathBuf,
}

impl FileSystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn object_path(&self, id: &FileId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn tmp_path(&self, id: &FileId) -> PathBuf {
        self.root.join("tmp").join(id.as_str())
    }

    fn map_io(id: &FileId, err: std::io::Error) -> AttachError {
        if err.kind() == std::io::ErrorKind::NotFound {
            AttachError::not_found(id.as_str())
        } else {
            AttachError::from(err)
        }
    }
}

#[async_trait]
impl Backend for FileSystemBackend {
    async fn upload(&self, source: &mut dyn UploadStream) -> AttachResult<FileId> {
        let id = FileId::generate();
        let tmp = self.tmp_path(&id);
        if let Some(parent) = tmp.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&tmp).await?;
        let written: std::io::Result<()> = async {
            while !source.eof() {
                let chunk = source.read(READ_CHUNK).await?;
                if chunk.is_empty() {
                    break;
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        fs::rename(&tmp, self.object_path(&id)).await?;
        debug!(id = %id, "object written");
        Ok(id)
    }

    async fn get(&self, id: &FileId) -> AttachResult<ByteStream> {
        let path = self.object_path(id);
        let mut file = fs::File::open(&path)
            .await
            .map_err(|err| Self::map_io(id, err))?;

        let stream = async_stream::stream! {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => yield Ok(Bytes::copy_from_slice(&buf[..n])),
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn delete(&self, id: &FileId) -> AttachResult<()> {
        match fs::remove_file(self.object_path(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, id: &FileId) -> AttachResult<bool> {
        Ok(fs::try_exists(self.object_path(id)).await?)
    }

    async fn size(&self, id: &FileId) -> AttachResult<u64> {
        let meta = fs::metadata(self.object_path(id))
            .await
            .map_err(|err| Self::map_io(id, err))?;
        Ok(meta.len())
    }
}
