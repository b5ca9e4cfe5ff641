use bytes::Bytes;

use crate::{record::RecordData, schema::BaseSchema};

pub mod airtable;

/// The tabular data source a record is read from and written back to.
pub trait RecordSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_record(
        &self,
        base_id: &str,
        table_id: &str,
        record_id: &str,
    ) -> impl Future<Output = Result<RecordData, Self::Error>> + Send;

    fn fetch_base_schema(
        &self,
        base_id: &str,
    ) -> impl Future<Output = Result<BaseSchema, Self::Error>> + Send;

    fn update_record(
        &self,
        base_id: &str,
        table_id: &str,
        record_id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> impl Future<Output = Result<RecordData, Self::Error>> + Send;
}

/// Downloads the body behind a (temporary) attachment URL.
pub trait Fetch {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(&self, url: &url::Url) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}
