use std::collections::HashSet;

use itertools::{Either, Itertools as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("table {0} not found")]
    TableNotFound(String),
    #[error("view {view} not found in table {table}")]
    ViewNotFound { table: String, view: String },
    #[error("primary field {primary} not found in table {table}")]
    PrimaryFieldMissing { table: String, primary: String },
}

/// Field kinds known to the source system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    MultipleAttachments,
    SingleLineText,
    MultilineText,
    RichText,
    Email,
    Url,
    PhoneNumber,
    Number,
    Percent,
    Currency,
    Rating,
    Duration,
    Checkbox,
    Date,
    DateTime,
    CreatedTime,
    LastModifiedTime,
    AutoNumber,
    Barcode,
    Formula,
    Rollup,
    Count,
    SingleSelect,
    MultipleSelects,
    SingleCollaborator,
    MultipleCollaborators,
    CreatedBy,
    LastModifiedBy,
    MultipleRecordLinks,
    MultipleLookupValues,
    Button,
    Other(String),
}

const FIELD_TYPE_NAMES: &[(&str, FieldType)] = &[
    ("multipleAttachments", FieldType::MultipleAttachments),
    ("singleLineText", FieldType::SingleLineText),
    ("multilineText", FieldType::MultilineText),
    ("richText", FieldType::RichText),
    ("email", FieldType::Email),
    ("url", FieldType::Url),
    ("phoneNumber", FieldType::PhoneNumber),
    ("number", FieldType::Number),
    ("percent", FieldType::Percent),
    ("currency", FieldType::Currency),
    ("rating", FieldType::Rating),
    ("duration", FieldType::Duration),
    ("checkbox", FieldType::Checkbox),
    ("date", FieldType::Date),
    ("dateTime", FieldType::DateTime),
    ("createdTime", FieldType::CreatedTime),
    ("lastModifiedTime", FieldType::LastModifiedTime),
    ("autoNumber", FieldType::AutoNumber),
    ("barcode", FieldType::Barcode),
    ("formula", FieldType::Formula),
    ("rollup", FieldType::Rollup),
    ("count", FieldType::Count),
    ("singleSelect", FieldType::SingleSelect),
    ("multipleSelects", FieldType::MultipleSelects),
    ("singleCollaborator", FieldType::SingleCollaborator),
    ("multipleCollaborators", FieldType::MultipleCollaborators),
    ("createdBy", FieldType::CreatedBy),
    ("lastModifiedBy", FieldType::LastModifiedBy),
    ("multipleRecordLinks", FieldType::MultipleRecordLinks),
    ("multipleLookupValues", FieldType::MultipleLookupValues),
    ("button", FieldType::Button),
];

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        FIELD_TYPE_NAMES
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, ty)| ty.clone())
            .unwrap_or(Self::Other(value))
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(name) => name,
            known => FIELD_TYPE_NAMES
                .iter()
                .find(|(_, ty)| *ty == known)
                .map(|(name, _)| (*name).to_owned())
                .unwrap_or_default(),
        }
    }
}

impl FieldType {
    pub fn is_attachment_collection(&self) -> bool {
        matches!(self, Self::MultipleAttachments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visible_field_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub primary_field_id: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub views: Vec<RawView>,
}

/// Base schema as returned by the metadata API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSchema {
    pub tables: Vec<RawTable>,
}

/// The renderable part of one table as seen through one view.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub(crate) table_id: String,
    pub(crate) primary_field: FieldDefinition,
    pub(crate) fields: Vec<FieldDefinition>,
    pub(crate) visible_field_ids: HashSet<String>,
    pub(crate) scalar_fields: Vec<FieldDefinition>,
    pub(crate) attachment_fields: Vec<FieldDefinition>,
}

impl TableSchema {
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn primary_field(&self) -> &FieldDefinition {
        &self.primary_field
    }

    /// Visible fields, in schema order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn is_visible(&self, field_id: &str) -> bool {
        self.visible_field_ids.contains(field_id)
    }

    /// Visible fields shown in the key/value table. Never contains the
    /// primary field or an attachment field.
    pub fn scalar_fields(&self) -> &[FieldDefinition] {
        &self.scalar_fields
    }

    pub fn attachment_fields(&self) -> &[FieldDefinition] {
        &self.attachment_fields
    }
}

pub fn resolve(raw: &BaseSchema, table_id: &str, view_id: &str) -> Result<TableSchema, Error> {
    let table = raw
        .tables
        .iter()
        .find(|table| table.id == table_id)
        .ok_or_else(|| Error::TableNotFound(table_id.to_owned()))?;
    let view = table
        .views
        .iter()
        .find(|view| view.id == view_id)
        .ok_or_else(|| Error::ViewNotFound {
            table: table_id.to_owned(),
            view: view_id.to_owned(),
        })?;
    let primary_field = table
        .fields
        .iter()
        .find(|field| field.id == table.primary_field_id)
        .cloned()
        .ok_or_else(|| Error::PrimaryFieldMissing {
            table: table_id.to_owned(),
            primary: table.primary_field_id.clone(),
        })?;

    let visible_field_ids = view.visible_field_ids.iter().cloned().collect::<HashSet<_>>();
    let fields = table
        .fields
        .iter()
        .filter(|field| visible_field_ids.contains(&field.id))
        .cloned()
        .collect::<Vec<_>>();
    let (attachment_fields, scalar_fields): (Vec<_>, Vec<_>) = fields
        .iter()
        .filter(|field| field.id != primary_field.id)
        .cloned()
        .partition_map(|field| {
            if field.field_type.is_attachment_collection() {
                Either::Left(field)
            } else {
                Either::Right(field)
            }
        });

    Ok(TableSchema {
        table_id: table.id.clone(),
        primary_field,
        fields,
        visible_field_ids,
        scalar_fields,
        attachment_fields,
    })
}
