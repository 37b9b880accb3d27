use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::ObjectStore;
use crate::error::StorageError;

/// S3-backed implementation of [`ObjectStore`].
///
/// Works against AWS S3 and S3-compatible services (MinIO, the storage API
/// of hosted Postgres platforms, etc.). Objects are written to
/// `{prefix}{key}` inside a single bucket.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Create a new store for the given bucket.
    ///
    /// # Arguments
    /// * `client` - AWS S3 client to use for requests
    /// * `bucket` - Bucket receiving uploaded objects
    /// * `prefix` - Key prefix for every object (e.g. `"avatars/"`), may be empty
    /// * `public_base_url` - URL under which the bucket's objects are publicly readable
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let is_server_error = e
                    .raw_response()
                    .map(|r| r.status().as_u16() >= 500)
                    .unwrap_or(false);
                if is_server_error {
                    StorageError::Connection(e.to_string())
                } else {
                    StorageError::S3(e.to_string())
                }
            })?;

        debug!(bucket = %self.bucket, key, size, "Stored object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        debug!(bucket = %self.bucket, key, "Deleted object");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if is_not_found {
                    StorageError::NotFound(format!("s3://{}", self.bucket))
                } else {
                    StorageError::Connection(e.to_string())
                }
            })?;
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    fn key_prefix(&self) -> &str {
        &self.prefix
    }
}

/// Public base URL for a bucket when none is configured explicitly.
///
/// Custom endpoints use path-style addressing (`{endpoint}/{bucket}`), AWS
/// uses the virtual-hosted form.
pub fn default_public_base_url(endpoint: Option<&str>, bucket: &str, region: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
///
/// For AWS S3, pass `None` to use the default endpoint:
/// ```ignore
/// let client = create_s3_client(None, "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally require path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
