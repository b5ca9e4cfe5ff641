use serde::{Deserialize, Serialize};

/// One row of the source table, keyed by field id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordData {
    pub id: String,
    #[serde(default, rename = "createdTime", skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A file attached to a record. The url is temporary and only valid for the
/// duration of one render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    pub id: String,
    pub filename: String,
    pub url: url::Url,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// How a field value shows up in the scalar table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// No value for this record.
    Absent,
    Text(String),
    /// Never shown as an opaque structure.
    Structured(Shape),
}

/// Kind of a value that has no single-line text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    List,
    Object,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::List => "a list",
            Self::Object => "an object",
        })
    }
}

impl From<Option<&serde_json::Value>> for CellValue {
    fn from(value: Option<&serde_json::Value>) -> Self {
        match value {
            None => Self::Absent,
            Some(serde_json::Value::String(s)) => Self::Text(s.clone()),
            Some(serde_json::Value::Number(n)) => Self::Text(n.to_string()),
            Some(serde_json::Value::Bool(b)) => Self::Text(b.to_string()),
            Some(serde_json::Value::Null) => Self::Structured(Shape::Null),
            Some(serde_json::Value::Array(_)) => Self::Structured(Shape::List),
            Some(serde_json::Value::Object(_)) => Self::Structured(Shape::Object),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("field {field} does not hold a list of attachments: {error}")]
pub struct MalformedAttachments {
    pub field: String,
    pub error: serde_json::Error,
}

impl RecordData {
    pub fn cell(&self, field_id: &str) -> CellValue {
        self.fields.get(field_id).into()
    }

    /// Attachments stored in `field_id`. An absent or null value is an empty list.
    pub fn attachments(&self, field_id: &str) -> Result<Vec<AttachmentDescriptor>, MalformedAttachments> {
        match self.fields.get(field_id) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|error| {
                MalformedAttachments {
                    field: field_id.to_owned(),
                    error,
                }
            }),
        }
    }

    /// Display text of the primary field, used as the document title.
    pub fn title(&self, primary_field_id: &str) -> String {
        match self.fields.get(primary_field_id) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}
