use std::{path::PathBuf, time::Duration};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    Error,
    notice::{self, Notice},
    paths::FilePathConfig,
    render::{self, Renderer},
    replicate::Replicator,
    schema,
    source::{Fetch, RecordSource},
    storage::{Acl, ObjectStore},
};

/// One render request, as handed over by the surrounding job system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobRequest {
    pub base_id: String,
    pub record_id: String,
    pub table_id: String,
    pub target_attachment_field_name_or_id: String,
    pub view_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Time-limited URL of the uploaded document.
    pub url: url::Url,
    /// Non-fatal findings about the record, in the order they were raised.
    pub notices: Vec<Notice>,
}

pub struct Settings {
    pub scratch_root: PathBuf,
    pub output_filename: String,
    pub web_base: url::Url,
    pub presign_ttl: Duration,
}

pub struct Pipeline<'a, R, F, S> {
    pub source: &'a R,
    pub fetcher: &'a F,
    pub store: &'a S,
    pub settings: &'a Settings,
}

impl<R, F, S> Pipeline<'_, R, F, S>
where
    R: RecordSource + Sync,
    F: Fetch + Sync,
    S: ObjectStore + Sync,
{
    pub async fn run(&self, job: &JobRequest) -> Result<Rendered, Error> {
        let (record, raw_schema) = futures::future::try_join(
            self.source
                .fetch_record(&job.base_id, &job.table_id, &job.record_id),
            self.source.fetch_base_schema(&job.base_id),
        )
        .await
        .map_err(|error| Error::Transport(Box::new(error)))
        .inspect_err(|error| error!(%error, "Failed to fetch record"))?;
        info!(record = %record.id, "fetched record and schema");

        let schema = schema::resolve(&raw_schema, &job.table_id, &job.view_id)
            .map_err(Error::Schema)
            .inspect_err(|error| error!(%error, "Failed to resolve schema"))?;

        let paths = FilePathConfig::new(
            &self.settings.scratch_root,
            &job.base_id,
            &job.table_id,
            &job.record_id,
            &self.settings.output_filename,
        )
        .map_err(Error::Path)?;
        tokio::fs::create_dir_all(&paths.scratch_dir)
            .await
            .map_err(Error::Scratch)
            .inspect_err(|error| error!(%error, dir = %paths.scratch_dir.display(), "Failed to create scratch directory"))?;

        let renderer = Renderer::new(
            Replicator::new(self.fetcher, self.store),
            self.settings.web_base.clone(),
        );
        let (rendered, notices) = notice::collect(renderer.render(&record, &schema, &paths)).await;
        let output = rendered
            .map_err(Error::from)
            .inspect_err(|error| error!(%error, "Failed to render document"))?;
        info!(path = %output.display(), notices = notices.len(), "rendered document");

        let body = tokio::fs::read(&output).await.map_err(Error::Scratch)?;
        let stored = self
            .store
            .put(
                paths.output_key(),
                mime::APPLICATION_PDF.to_string(),
                Acl::Private,
                Bytes::from(body),
            )
            .await
            .map_err(|error| Error::Storage(Box::new(error)))
            .inspect_err(|error| error!(%error, "Failed to upload document"))?;
        let url = self
            .store
            .presign(stored.key, self.settings.presign_ttl)
            .await
            .map_err(|error| Error::Storage(Box::new(error)))
            .inspect_err(|error| error!(%error, "Failed to presign document"))?;

        let mut fields = serde_json::Map::new();
        fields.insert(
            job.target_attachment_field_name_or_id.clone(),
            serde_json::json!([{ "url": url.as_str() }]),
        );
        self.source
            .update_record(&job.base_id, &job.table_id, &job.record_id, fields)
            .await
            .map_err(|error| Error::Transport(Box::new(error)))
            .inspect_err(|error| error!(%error, "Failed to update record"))?;
        info!(record = %record.id, "attached document to record");

        Ok(Rendered { url, notices })
    }
}

impl From<render::Error> for Error {
    fn from(error: render::Error) -> Self {
        match error {
            render::Error::Attachment(error) => Error::Attachment(error),
            other => Error::Render(other),
        }
    }
}
