use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;
use tracing::debug;

use super::{Acl, ObjectStore, StoredObject};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("failed to write {path}: {error}")]
    Write { path: PathBuf, error: std::io::Error },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("cannot express {0} as a file URL")]
    Location(PathBuf),
}

/// Objects stored as plain files under one directory. ACLs are ignored and
/// presigned URLs are the file URLs themselves.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        Ok(Self {
            root: std::path::absolute(root)?,
        })
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, Error> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(Error::InvalidKey(key.to_owned()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn location(path: &Path) -> Result<url::Url, Error> {
        url::Url::from_file_path(path).map_err(|()| Error::Location(path.to_owned()))
    }
}

impl ObjectStore for Store {
    type Error = Error;

    async fn put(
        &self,
        key: String,
        _content_type: String,
        _acl: Acl,
        body: Bytes,
    ) -> Result<StoredObject, Self::Error> {
        let path = self.path_of(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| Error::Write {
                    path: parent.to_owned(),
                    error,
                })?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|error| Error::Write {
                path: path.clone(),
                error,
            })?;
        debug!(path = %path.display(), size = body.len(), "stored object");
        Ok(StoredObject {
            location: Self::location(&path)?,
            key,
        })
    }

    async fn presign(&self, key: String, _ttl: Duration) -> Result<url::Url, Self::Error> {
        let path = self.path_of(&key)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::location(&path),
            _ => Err(Error::NotFound(key)),
        }
    }
}
