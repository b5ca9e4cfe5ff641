//! Attachment replication: download each attachment of a field, keep an
//! inline preview for the raster formats a document can embed, and copy the
//! file to durable storage so the document can link to it after the source's
//! temporary URL has expired.

use bytes::Bytes;
use tracing::debug;

use crate::{
    BoxError,
    paths::{self, FilePathConfig},
    preview::{InlinePreview, PreviewType},
    record::AttachmentDescriptor,
    source::Fetch,
    storage::{Acl, ObjectStore},
};

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("invalid attachment id: {0}")]
    InvalidId(paths::Error),
    #[error("download failed: {0}")]
    Download(BoxError),
    #[error("scratch file I/O failed: {0}")]
    Scratch(std::io::Error),
    #[error("upload failed: {0}")]
    Upload(BoxError),
}

#[derive(Debug, thiserror::Error)]
#[error("attachment {id}: {kind}")]
pub struct Error {
    pub id: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedAttachment {
    pub descriptor: AttachmentDescriptor,
    pub permanent_url: url::Url,
    /// Present exactly when the content type is previewable.
    pub inline_preview: Option<InlinePreview>,
}

pub struct Replicator<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
}

impl<'a, F: Fetch + Sync, S: ObjectStore + Sync> Replicator<'a, F, S> {
    pub fn new(fetcher: &'a F, store: &'a S) -> Self {
        Self { fetcher, store }
    }

    /// Replicates a batch concurrently. The output keeps the input order. The
    /// first failure fails the whole batch and drops the attachments still in
    /// flight.
    pub async fn replicate(
        &self,
        attachments: &[AttachmentDescriptor],
        paths: &FilePathConfig,
    ) -> Result<Vec<EnrichedAttachment>, Error> {
        futures::future::try_join_all(
            attachments
                .iter()
                .map(|attachment| self.replicate_one(attachment, paths)),
        )
        .await
    }

    async fn replicate_one(
        &self,
        attachment: &AttachmentDescriptor,
        paths: &FilePathConfig,
    ) -> Result<EnrichedAttachment, Error> {
        let fail = |kind| Error {
            id: attachment.id.clone(),
            kind,
        };
        let scratch_path = paths
            .attachment_scratch_path(&attachment.id, &attachment.filename)
            .map_err(|error| fail(ErrorKind::InvalidId(error)))?;
        let key = paths
            .attachment_key(&attachment.id, &attachment.filename)
            .map_err(|error| fail(ErrorKind::InvalidId(error)))?;

        let body = self
            .fetcher
            .fetch(&attachment.url)
            .await
            .map_err(|error| fail(ErrorKind::Download(Box::new(error))))?;
        tokio::fs::write(&scratch_path, &body)
            .await
            .map_err(|error| fail(ErrorKind::Scratch(error)))?;
        debug!(id = %attachment.id, path = %scratch_path.display(), size = body.len(), "downloaded attachment");

        let content = tokio::fs::read(&scratch_path)
            .await
            .map_err(|error| fail(ErrorKind::Scratch(error)))?;
        let inline_preview = PreviewType::from_mime(&attachment.content_type)
            .map(|kind| InlinePreview::encode(kind, &content));

        let stored = self
            .store
            .put(
                key,
                attachment.content_type.clone(),
                Acl::PublicRead,
                Bytes::from(content),
            )
            .await
            .map_err(|error| fail(ErrorKind::Upload(Box::new(error))))?;
        debug!(id = %attachment.id, location = %stored.location, "replicated attachment");

        Ok(EnrichedAttachment {
            descriptor: attachment.clone(),
            permanent_url: stored.location,
            inline_preview,
        })
    }
}
