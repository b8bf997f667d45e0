//! S3-compatible object store backend (MinIO)
//!
//! Objects live under their key in a single bucket. Path-style addressing is
//! forced so that MinIO endpoints such as `http://localhost:9000` work without
//! virtual-host DNS.

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{ObjectStoreError, StoredObject};
use crate::config::Config;

/// Object store backed by an S3 API endpoint
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client for the MinIO endpoint in `config`
    pub async fn from_config(config: &Config) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.minio_root_user.reveal(),
            config.minio_root_password.reveal(),
            None, // session_token
            None, // expiry
            "ecostream-config",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.minio_region.clone()))
            .endpoint_url(config.minio_endpoint())
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::info!(
            endpoint = %config.minio_endpoint(),
            bucket = %config.bucket,
            "S3 object store client initialized"
        );

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket unless it already exists
    pub async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket created");
                Ok(())
            }
            Err(err) => {
                let exists = err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists())
                    .unwrap_or(false);
                if exists {
                    tracing::debug!(bucket = %self.bucket, "Bucket already exists");
                    Ok(())
                } else {
                    Err(map_sdk_error("create_bucket", err))
                }
            }
        }
    }

    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), ObjectStoreError> {
        tracing::debug!(bucket = %self.bucket, key = %key, "put_object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_object", e))?;

        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<StoredObject, ObjectStoreError> {
        tracing::debug!(bucket = %self.bucket, key = %key, "get_object");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    map_sdk_error("get_object", e)
                }
            })?;

        let content_type = resp.content_type().map(str::to_string);
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Request(format!("get_object body: {}", e)))?
            .into_bytes();

        Ok(StoredObject {
            key: key.to_string(),
            data,
            content_type: content_type.unwrap_or_default(),
        })
    }
}

/// Transport failures are connection errors; everything else is a failed request
fn map_sdk_error<E, R>(op: &str, err: SdkError<E, R>) -> ObjectStoreError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{}: {}", op, DisplayErrorContext(&err));
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            ObjectStoreError::Connection(message)
        }
        _ => ObjectStoreError::Request(message),
    }
}
