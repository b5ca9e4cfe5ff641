use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Fetch, RecordSource};
use crate::{record::RecordData, schema::BaseSchema};

pub const DEFAULT_API_BASE: &str = "https://api.airtable.com/v0/";
pub const DEFAULT_WEB_BASE: &str = "https://airtable.com/";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("request failed. status: {status}, body: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(url::ParseError),
}

pub struct Client {
    api_base: url::Url,
    token: String,
    client: reqwest::Client,
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

const UNREADABLE_BODY: &str = "<unreadable body>";

async fn read_success(response: reqwest::Response) -> Result<Bytes, Error> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY.to_owned());
        return Err(Error::Status { status, body });
    }
    response.bytes().await.map_err(Error::Transport)
}

impl Client {
    pub fn new(api_base: url::Url, token: impl Into<String>) -> Self {
        Self {
            api_base,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, Error> {
        self.api_base.join(path).map_err(Error::Endpoint)
    }

    fn record_endpoint(&self, base_id: &str, table_id: &str, record_id: &str) -> Result<url::Url, Error> {
        self.endpoint(&format!(
            "{}/{}/{}",
            segment(base_id),
            segment(table_id),
            segment(record_id)
        ))
    }

    async fn send<T: DeserializeOwned + Send>(&self, request: reqwest::RequestBuilder) -> Result<T, Error> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Error::Transport)?;
        let body = read_success(response).await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}

impl RecordSource for Client {
    type Error = Error;

    async fn fetch_record(
        &self,
        base_id: &str,
        table_id: &str,
        record_id: &str,
    ) -> Result<RecordData, Self::Error> {
        let mut endpoint = self.record_endpoint(base_id, table_id, record_id)?;
        endpoint
            .query_pairs_mut()
            .append_pair("returnFieldsByFieldId", "true");
        debug!(%endpoint, "fetch record");
        self.send(self.client.get(endpoint)).await
    }

    async fn fetch_base_schema(&self, base_id: &str) -> Result<BaseSchema, Self::Error> {
        let mut endpoint = self.endpoint(&format!("meta/bases/{}/tables", segment(base_id)))?;
        endpoint
            .query_pairs_mut()
            .append_pair("include", "visibleFieldIds");
        debug!(%endpoint, "fetch base schema");
        self.send(self.client.get(endpoint)).await
    }

    async fn update_record(
        &self,
        base_id: &str,
        table_id: &str,
        record_id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<RecordData, Self::Error> {
        let endpoint = self.record_endpoint(base_id, table_id, record_id)?;
        debug!(%endpoint, "update record");
        self.send(
            self.client
                .patch(endpoint)
                .json(&serde_json::json!({ "fields": fields })),
        )
        .await
    }
}

/// Plain unauthenticated GET for attachment URLs, which are pre-signed by the source.
#[derive(Default)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetch for Downloader {
    type Error = Error;

    async fn fetch(&self, url: &url::Url) -> Result<Bytes, Self::Error> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;
        read_success(response).await
    }
}
