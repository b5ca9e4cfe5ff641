use std::time::Duration;

use bytes::Bytes;

pub mod local;
pub mod s3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acl {
    Private,
    PublicRead,
}

/// Where an uploaded object can be read back from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub location: url::Url,
}

/// Durable object storage. Keys are `/`-separated and never start with `/`.
pub trait ObjectStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(
        &self,
        key: String,
        content_type: String,
        acl: Acl,
        body: Bytes,
    ) -> impl Future<Output = Result<StoredObject, Self::Error>> + Send;

    /// Time-limited read URL for a private object.
    fn presign(
        &self,
        key: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<url::Url, Self::Error>> + Send;
}
