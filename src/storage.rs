use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::debug;

use crate::config::StorageConfig;

/// Blob store behind uploaded documents.
///
/// Keys follow `documents/{user_id}/{document_id}.{ext}` (built by
/// [`crate::documents::model::object_key`]). A key is written once when its
/// document is uploaded and removed when the document row is deleted; the row
/// is the only index of what the bucket holds.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Stores the file body under `key`, tagged with its MIME type.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;

    /// Removing a key that is already gone is not an error.
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;

    /// Time-limited GET URL. The browser saves the file as `download_name`.
    async fn presign_get(
        &self,
        key: &str,
        download_name: &str,
        ttl: Duration,
    ) -> anyhow::Result<String>;
}

/// `Content-Disposition` for a stored document, shown inline in the browser.
///
/// Original upload names are user input; anything outside printable ASCII,
/// plus quotes and backslashes, becomes `_`.
pub fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("inline; filename=\"{}\"", safe.trim())
}

/// MinIO (or any S3-compatible) bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "healthlog-env",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        // MinIO serves buckets by path, not by subdomain.
        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("store document object {key}"))?;
        debug!(%key, size, "document object stored");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete document object {key}"))?;
        debug!(%key, "document object deleted");
        Ok(())
    }

    async fn presign_get(
        &self,
        key: &str,
        download_name: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(content_disposition(download_name))
            .presigned(PresigningConfig::expires_in(ttl)?)
            .await
            .with_context(|| format!("presign download for {key}"))?;
        Ok(presigned.uri().to_string())
    }
}
