use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;

use crate::uploads::{validate_key, StorageError, UploadStore};

/// Stores uploads in an S3 (or MinIO) bucket.
pub struct S3UploadStore {
    client: S3Client,
    bucket: String,
}

impl S3UploadStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl UploadStore for S3UploadStore {
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload failed: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        // S3 DeleteObject succeeds for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("delete failed: {e}")))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
