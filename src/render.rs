use std::path::PathBuf;

use tracing::{debug, warn};

use crate::{
    document::{
        self, Color, Document,
        style::{Column, TextOptions, reset_style, styled_text, table},
    },
    notice::{self, Notice},
    paths::FilePathConfig,
    preview,
    record::{CellValue, MalformedAttachments, RecordData},
    replicate::{self, EnrichedAttachment, Replicator},
    schema::TableSchema,
    source::Fetch,
    storage::ObjectStore,
};

const TITLE_FONT_SIZE: f32 = 20.0;
const NOTE_FONT_SIZE: f32 = 12.0;
const PLACEHOLDER_FONT_SIZE: f32 = 11.2;
const PREVIEW_HEIGHT: f32 = 250.0;

const COLUMNS: [Column<'static>; 2] = [
    Column {
        label: "Name",
        width: 125.0,
    },
    Column {
        label: "Value",
        width: 300.0,
    },
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Attachment(replicate::Error),
    #[error("failed to draw document: {0}")]
    Draw(document::Error),
    #[error(transparent)]
    MalformedAttachments(MalformedAttachments),
    #[error("broken inline preview: {0}")]
    Preview(preview::Error),
    #[error("failed to build record link: {0}")]
    Link(url::ParseError),
    #[error("failed to write document: {0}")]
    Write(std::io::Error),
}

/// `[name, value]` rows for every visible scalar field holding a string,
/// number or boolean, in schema order. Every other value is left out and
/// raised as a [`Notice::OmittedField`].
pub fn scalar_rows(record: &RecordData, schema: &TableSchema) -> Vec<[String; 2]> {
    schema
        .scalar_fields()
        .iter()
        .filter_map(|field| match record.cell(&field.id) {
            CellValue::Text(value) => Some([field.name.clone(), value]),
            CellValue::Absent => None,
            CellValue::Structured(shape) => {
                warn!(record = %record.id, field = %field.id, %shape, "omitting structured value");
                notice::raise(Notice::OmittedField {
                    field_id: field.id.clone(),
                    field_name: field.name.clone(),
                    shape,
                });
                None
            }
        })
        .collect()
}

pub struct Renderer<'a, F, S> {
    replicator: Replicator<'a, F, S>,
    web_base: url::Url,
}

impl<'a, F: Fetch + Sync, S: ObjectStore + Sync> Renderer<'a, F, S> {
    pub fn new(replicator: Replicator<'a, F, S>, web_base: url::Url) -> Self {
        Self {
            replicator,
            web_base,
        }
    }

    pub fn record_link(&self, paths: &FilePathConfig) -> Result<url::Url, url::ParseError> {
        self.web_base.join(&paths.record_path)
    }

    /// Renders `record` to `paths.output_full_path`. The returned future
    /// resolves only after the file has been completely written and synced.
    pub async fn render(
        &self,
        record: &RecordData,
        schema: &TableSchema,
        paths: &FilePathConfig,
    ) -> Result<PathBuf, Error> {
        let title = record.title(&schema.primary_field().id);
        let mut doc = Document::new(title.clone());

        reset_style(&mut doc);
        styled_text(
            &mut doc,
            &title,
            &TextOptions::default()
                .bold(true)
                .font_size(TITLE_FONT_SIZE)
                .fill_color(Color::ACCENT),
        );
        let link = self.record_link(paths).map_err(Error::Link)?;
        styled_text(
            &mut doc,
            "View record in Airtable",
            &TextOptions::default()
                .font_size(NOTE_FONT_SIZE)
                .fill_color(Color::BLUE)
                .link(link),
        );
        doc.move_down(2.0);
        styled_text(
            &mut doc,
            "Only fields with string, numeric or boolean values are listed below.",
            &TextOptions::default().font_size(NOTE_FONT_SIZE).move_down(1.0),
        );

        table(&mut doc, &COLUMNS, &scalar_rows(record, schema));

        for field in schema.attachment_fields() {
            let attachments = record
                .attachments(&field.id)
                .map_err(Error::MalformedAttachments)?;
            doc.add_page();
            styled_text(
                &mut doc,
                &field.name,
                &TextOptions::default().bold(true).move_down(0.5),
            );
            if attachments.is_empty() {
                styled_text(
                    &mut doc,
                    "No attachments found",
                    &TextOptions::default().font_size(PLACEHOLDER_FONT_SIZE),
                );
                continue;
            }
            debug!(field = %field.id, count = attachments.len(), "replicating attachments");
            let enriched = self
                .replicator
                .replicate(&attachments, paths)
                .await
                .map_err(Error::Attachment)?;
            for attachment in &enriched {
                draw_attachment(&mut doc, attachment)?;
            }
        }

        let written = doc
            .write_to(&paths.output_full_path)
            .await
            .map_err(|error| match error {
                document::Error::Write(error) => Error::Write(error),
                other => Error::Draw(other),
            })?;
        debug!(path = %paths.output_full_path.display(), bytes = written, "document written");
        Ok(paths.output_full_path.clone())
    }
}

fn draw_attachment(doc: &mut Document, attachment: &EnrichedAttachment) -> Result<(), Error> {
    let link = &attachment.permanent_url;
    let caption = TextOptions::default()
        .fill_color(Color::BLUE)
        .link(link.clone())
        .move_down(1.0);
    match &attachment.inline_preview {
        Some(preview) => {
            let body = preview.decode().map_err(Error::Preview)?;
            doc.image(&body, preview.kind.image_format(), PREVIEW_HEIGHT, Some(link))
                .map_err(Error::Draw)?;
            styled_text(doc, &attachment.descriptor.filename, &caption);
        }
        None => styled_text(
            doc,
            &format!("{} (No preview)", attachment.descriptor.filename),
            &caption,
        ),
    }
    Ok(())
}
