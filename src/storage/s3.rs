use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, types::ObjectCannedAcl};
use bytes::Bytes;
use tracing::debug;

use super::{Acl, ObjectStore, StoredObject};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to put object: {0}")]
    Put(String),
    #[error("Failed to presign object: {0}")]
    Presign(String),
    #[error("Invalid object location: {0}")]
    Location(url::ParseError),
}

pub struct Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint: Option<url::Url>,
}

impl Store {
    /// Credentials come from the default AWS provider chain. A custom
    /// endpoint switches to path-style addressing.
    pub async fn new(
        bucket: impl Into<String>,
        region: Option<String>,
        endpoint: Option<url::Url>,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }
        let config = loader.load().await;
        let region = config
            .region()
            .map(|region| region.to_string())
            .unwrap_or_else(|| "us-east-1".to_owned());
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(endpoint.is_some())
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: bucket.into(),
            region,
            endpoint,
        }
    }

    fn location(&self, key: &str) -> Result<url::Url, url::ParseError> {
        object_location(&self.bucket, &self.region, self.endpoint.as_ref(), key)
    }
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Public URL of `key`, virtual-hosted on AWS and path-style on custom endpoints.
pub fn object_location(
    bucket: &str,
    region: &str,
    endpoint: Option<&url::Url>,
    key: &str,
) -> Result<url::Url, url::ParseError> {
    let key = encode_key(key);
    match endpoint {
        Some(endpoint) => url::Url::parse(&format!(
            "{}/{bucket}/{key}",
            endpoint.as_str().trim_end_matches('/')
        )),
        None => url::Url::parse(&format!(
            "https://{bucket}.s3.{region}.amazonaws.com/{key}"
        )),
    }
}

impl ObjectStore for Store {
    type Error = Error;

    async fn put(
        &self,
        key: String,
        content_type: String,
        acl: Acl,
        body: Bytes,
    ) -> Result<StoredObject, Self::Error> {
        let canned = match acl {
            Acl::Private => ObjectCannedAcl::Private,
            Acl::PublicRead => ObjectCannedAcl::PublicRead,
        };
        debug!(bucket = %self.bucket, %key, %content_type, size = body.len(), "put object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .acl(canned)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|error| Error::Put(error.to_string()))?;
        let location = self.location(&key).map_err(Error::Location)?;
        Ok(StoredObject { key, location })
    }

    async fn presign(&self, key: String, ttl: Duration) -> Result<url::Url, Self::Error> {
        let config =
            PresigningConfig::expires_in(ttl).map_err(|error| Error::Presign(error.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|error| Error::Presign(error.to_string()))?;
        url::Url::parse(request.uri()).map_err(Error::Location)
    }
}
