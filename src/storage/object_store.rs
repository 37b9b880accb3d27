use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Trait for writing publicly readable objects to remote storage.
///
/// Profile images are the only objects this service stores. Implementations
/// must be thread-safe; one instance is shared by every request.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> Result<(), StorageError>;

    /// Remove the object stored under `key`.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Base URL under which stored objects are publicly reachable, without a
    /// trailing slash.
    fn public_base_url(&self) -> &str;

    /// Prefix prepended to every key this service writes (may be empty).
    fn key_prefix(&self) -> &str;

    /// Public URL of the object stored under `key`.
    fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url(), encoded.join("/"))
    }

    /// Recover the key from a URL produced by [`public_url`](Self::public_url).
    ///
    /// Returns `None` for URLs that point somewhere else, including objects
    /// outside this service's key prefix.
    fn key_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(self.public_base_url())?.strip_prefix('/')?;
        let key = urlencoding::decode(rest).ok()?.into_owned();
        if key.is_empty() || !key.starts_with(self.key_prefix()) {
            return None;
        }
        Some(key)
    }
}
