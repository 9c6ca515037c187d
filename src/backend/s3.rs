use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::backend::{Backend, READ_CHUNK};
use crate::error::{AttachError, AttachResult};
use crate::stream::UploadStream;
use crate::types::{ByteStream, FileId};

/// Backend for any S3-compatible object store.
///
/// Uploads commit through the store's native atomic PUT. Reads are
/// buffered off the response body; propagation delays of the underlying
/// store surface to callers unchanged.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Backend {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Build a client from the ambient AWS environment
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket)
    }

    /// Explicit-credential constructor for S3-compatible stores such as
    /// MinIO, where the ambient AWS environment is not configured.
    pub fn with_static_credentials(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint_url: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            access_key_id.into(),
            secret_access_key.into(),
            None,
            None,
            "dog-attach-static",
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .endpoint_url(endpoint_url.into())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self::new(Client::from_conf(config), bucket)
    }

    /// Store objects under `prefix/` inside the bucket
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn key(&self, id: &FileId) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), id.as_str()),
            None => id.as_str().to_string(),
        }
    }
}

#[async_trait]
impl Backend for S3Backend {
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
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(&id))
            .body(S3Body::from(buf.freeze()))
            .send()
            .await
            .map_err(AttachError::backend)?;

        debug!(id = %id, bucket = %self.bucket, "object put");
        Ok(id)
    }

    async fn get(&self, id: &FileId) -> AttachResult<ByteStream> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    AttachError::not_found(id.as_str())
                } else {
                    AttachError::backend(service_err)
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(AttachError::backend)?
            .into_bytes();
        Ok(Box::pin(futures_util::stream::once(async move {
            Ok::<Bytes, std::io::Error>(data)
        })))
    }

    async fn delete(&self, id: &FileId) -> AttachResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .send()
            .await
            .map_err(AttachError::backend)?;
        Ok(())
    }

    async fn exists(&self, id: &FileId) -> AttachResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AttachError::backend(service_err))
                }
            }
        }
    }

    async fn size(&self, id: &FileId) -> AttachResult<u64> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    AttachError::not_found(id.as_str())
                } else {
                    AttachError::backend(service_err)
                }
            })?;
        Ok(head.content_length().unwrap_or(0) as u64)
    }

    async fn presigned_url(
        &self,
        id: &FileId,
        expires_in: Duration,
    ) -> AttachResult<Option<String>> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(AttachError::backend)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .presigned(presigning)
            .await
            .map_err(AttachError::backend)?;
        Ok(Some(request.uri().to_string()))
    }
}
