use std::time::Duration;

use crate::{
    notice::{self, Notice},
    preview::{InlinePreview, PreviewType},
    record::{AttachmentDescriptor, RecordData, Shape},
    render::{self, Renderer, scalar_rows},
    replicate::{ErrorKind, Replicator},
    schema,
    storage::Acl,
    tests::{
        FakeFetcher, MemoryStore, attachment, contains, encode_image, load_record, load_schema,
        occurrences, scratch_paths,
    },
};

fn web_base() -> url::Url {
    url::Url::parse("https://airtable.com/").unwrap()
}

fn descriptors(values: &[serde_json::Value]) -> Vec<AttachmentDescriptor> {
    serde_json::from_value(serde_json::Value::Array(values.to_vec())).unwrap()
}

fn with_field(mut record: RecordData, field: &str, value: serde_json::Value) -> RecordData {
    record.fields.insert(field.to_owned(), value);
    record
}

#[tokio::test]
async fn scalar_only_record_renders_without_attachment_pages() {
    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwScalars").unwrap();
    let record = load_record().await;

    let rows = scalar_rows(&record, &schema);
    assert_eq!(
        rows,
        [
            ["Season".to_owned(), "Spring 2024".to_owned()],
            [
                "Details".to_owned(),
                "Night-time photographs of the old harbour.\nShot on film.".to_owned()
            ],
        ]
    );

    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let fetcher = FakeFetcher::default();
    let store = MemoryStore::default();
    let renderer = Renderer::new(Replicator::new(&fetcher, &store), web_base());
    let output = renderer.render(&record, &schema, &paths).await.unwrap();

    assert_eq!(output, paths.output_full_path);
    let bytes = tokio::fs::read(&output).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(contains(&bytes, "%%EOF"));
    assert!(contains(&bytes, "Harbour Lights"));
    for text in ["Season", "Spring 2024", "Details", "Shot on film."] {
        assert!(contains(&bytes, text), "{text}");
    }
    assert!(contains(&bytes, "https://airtable.com/app1/tblSubmissions/rec1"));
    assert!(!contains(&bytes, "No attachments found"));
    assert!(fetcher.calls().is_empty());
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn empty_attachment_fields_render_placeholder_without_downloads() {
    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwFull").unwrap();
    let record = with_field(load_record().await, "fldRefs", serde_json::json!([]));

    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let fetcher = FakeFetcher::default();
    let store = MemoryStore::default();
    let renderer = Renderer::new(Replicator::new(&fetcher, &store), web_base());
    let (output, _) =
        notice::collect(renderer.render(&record, &schema, &paths)).await;
    let bytes = tokio::fs::read(output.unwrap()).await.unwrap();

    assert!(contains(&bytes, "Images"));
    assert!(contains(&bytes, "Reference Materials"));
    assert_eq!(occurrences(&bytes, "No attachments found"), 2);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn previews_only_for_png_and_jpeg() {
    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let png = encode_image(image::ImageFormat::Png);
    let fetcher = FakeFetcher::default()
        .serve("https://dl.test/att1", png.clone())
        .serve("https://dl.test/att2", &b"%PDF-1.4 brochure"[..]);
    let store = MemoryStore::default();
    let attachments = descriptors(&[
        attachment("att1", "photo.png", "image/png"),
        attachment("att2", "brochure.pdf", "application/pdf"),
    ]);

    let enriched = Replicator::new(&fetcher, &store)
        .replicate(&attachments, &paths)
        .await
        .unwrap();

    assert_eq!(enriched.len(), 2);
    let preview = enriched[0].inline_preview.as_ref().unwrap();
    assert_eq!(preview.kind, PreviewType::Png);
    assert!(preview.data_url().starts_with("data:image/png;base64,"));
    assert_eq!(preview.decode().unwrap(), png.to_vec());
    assert_eq!(enriched[1].inline_preview, None);

    assert_eq!(
        enriched[0].permanent_url.as_str(),
        "https://store.test/app1/tblSubmissions/rec1/att1__photo.png"
    );
    let (body, content_type, acl) = store
        .get("app1/tblSubmissions/rec1/att2__brochure.pdf")
        .await
        .unwrap();
    assert_eq!(&body[..], b"%PDF-1.4 brochure");
    assert_eq!(content_type, "application/pdf");
    assert_eq!(acl, Acl::PublicRead);
    assert!(
        tokio::fs::try_exists(paths.attachment_scratch_path("att1", "photo.png").unwrap())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn download_failure_fails_the_batch_and_the_document() {
    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let fetcher = FakeFetcher::default()
        .serve("https://dl.test/att1", &b"one"[..])
        .fail("https://dl.test/att2")
        .serve("https://dl.test/att3", &b"three"[..]);
    let store = MemoryStore::default();
    let values = [
        attachment("att1", "one.txt", "text/plain"),
        attachment("att2", "two.txt", "text/plain"),
        attachment("att3", "three.txt", "text/plain"),
    ];

    let error = Replicator::new(&fetcher, &store)
        .replicate(&descriptors(&values), &paths)
        .await
        .unwrap_err();
    assert_eq!(error.id, "att2");
    assert!(matches!(error.kind, ErrorKind::Download(_)));

    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwFull").unwrap();
    let record = with_field(load_record().await, "fldImages", serde_json::json!(values));
    let renderer = Renderer::new(Replicator::new(&fetcher, &store), web_base());
    let (result, _) =
        notice::collect(renderer.render(&record, &schema, &paths)).await;
    assert!(matches!(
        result,
        Err(render::Error::Attachment(ref error)) if error.id == "att2"
    ));
    assert!(
        !tokio::fs::try_exists(&paths.output_full_path)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn attachment_ids_cannot_escape_the_record_directory() {
    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let fetcher = FakeFetcher::default().serve("https://dl.test/x", &b"payload"[..]);
    let store = MemoryStore::default();
    let attachments = descriptors(&[attachment("../x", "evil.txt", "text/plain")]);

    let error = Replicator::new(&fetcher, &store)
        .replicate(&attachments, &paths)
        .await
        .unwrap_err();

    assert_eq!(error.id, "../x");
    assert!(matches!(error.kind, ErrorKind::InvalidId(_)));
    assert!(fetcher.calls().is_empty());
    assert!(store.keys().await.is_empty());
    let mut entries = tokio::fs::read_dir(&paths.scratch_dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
    assert!(
        !tokio::fs::try_exists(scratch.path().join("app1/tblSubmissions/x__evil.txt"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn enriched_list_keeps_input_order() {
    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let mut fetcher = FakeFetcher::default();
    let mut values = Vec::new();
    for (index, delay) in [40u64, 25, 10, 0].into_iter().enumerate() {
        let id = format!("att{index}");
        fetcher = fetcher.serve_after(
            &format!("https://dl.test/{id}"),
            id.clone().into_bytes(),
            Duration::from_millis(delay),
        );
        values.push(attachment(&id, &format!("{id}.txt"), "text/plain"));
    }
    let store = MemoryStore::default();
    let attachments = descriptors(&values);

    let enriched = Replicator::new(&fetcher, &store)
        .replicate(&attachments, &paths)
        .await
        .unwrap();
    let ids = enriched
        .iter()
        .map(|attachment| attachment.descriptor.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["att0", "att1", "att2", "att3"]);
}

#[tokio::test]
async fn structured_values_are_omitted_and_reported() {
    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwFull").unwrap();
    let record = load_record().await;

    let (rows, notices) = notice::collect(async { scalar_rows(&record, &schema) }).await;
    let names = rows.iter().map(|[name, _]| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Season", "Details", "Count"]);
    assert_eq!(rows[2][1], "3");
    assert!(!names.contains(&"Title"));
    assert_eq!(
        notices,
        [Notice::OmittedField {
            field_id: "fldTags".into(),
            field_name: "Tags".into(),
            shape: Shape::List,
        }]
    );
}

#[tokio::test]
async fn rendering_twice_yields_same_rows_and_links() {
    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwFull").unwrap();
    let record = with_field(
        load_record().await,
        "fldImages",
        serde_json::json!([
            attachment("att1", "photo.jpg", "image/jpeg"),
            attachment("att2", "notes.txt", "text/plain"),
        ]),
    );
    let fetcher = FakeFetcher::default()
        .serve("https://dl.test/att1", encode_image(image::ImageFormat::Jpeg))
        .serve("https://dl.test/att2", &b"notes"[..]);
    let store = MemoryStore::default();

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let scratch = tempfile::tempdir().unwrap();
        let paths = scratch_paths(scratch.path()).await;
        let enriched = Replicator::new(&fetcher, &store)
            .replicate(&record.attachments("fldImages").unwrap(), &paths)
            .await
            .unwrap();
        let renderer = Renderer::new(Replicator::new(&fetcher, &store), web_base());
        let (output, _) =
            notice::collect(renderer.render(&record, &schema, &paths)).await;
        let bytes = tokio::fs::read(output.unwrap()).await.unwrap();
        assert!(contains(&bytes, "https://store.test/app1/tblSubmissions/rec1/att1__photo.jpg"));
        assert!(contains(&bytes, "No preview"));
        outputs.push((
            scalar_rows(&record, &schema),
            enriched
                .into_iter()
                .map(|attachment| attachment.permanent_url)
                .collect::<Vec<_>>(),
        ));
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(
        store.keys().await,
        [
            "app1/tblSubmissions/rec1/att1__photo.jpg",
            "app1/tblSubmissions/rec1/att2__notes.txt",
        ]
    );
}

#[tokio::test]
async fn malformed_attachment_value_is_rejected() {
    let raw = load_schema().await;
    let schema = schema::resolve(&raw, "tblSubmissions", "viwFull").unwrap();
    let record = with_field(load_record().await, "fldImages", serde_json::json!("photo.png"));
    let scratch = tempfile::tempdir().unwrap();
    let paths = scratch_paths(scratch.path()).await;
    let fetcher = FakeFetcher::default();
    let store = MemoryStore::default();
    let renderer = Renderer::new(Replicator::new(&fetcher, &store), web_base());
    let (result, _) =
        notice::collect(renderer.render(&record, &schema, &paths)).await;
    assert!(matches!(
        result,
        Err(render::Error::MalformedAttachments(ref error)) if error.field == "fldImages"
    ));
}

#[test]
fn real_png_survives_data_url_round_trip() {
    let png = encode_image(image::ImageFormat::Png);
    let preview = InlinePreview::encode(PreviewType::Png, &png);
    let parsed = InlinePreview::parse(preview.data_url()).unwrap();
    assert_eq!(parsed.kind, PreviewType::Png);
    let decoded = parsed.decode().unwrap();
    assert_eq!(decoded, png.to_vec());
    image::load_from_memory_with_format(&decoded, image::ImageFormat::Png).unwrap();
}
