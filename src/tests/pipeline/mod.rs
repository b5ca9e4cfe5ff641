use std::time::Duration;

use crate::{
    Error,
    notice::Notice,
    pipeline::{JobRequest, Pipeline, Settings},
    record::Shape,
    storage::Acl,
    tests::{
        FakeFetcher, FakeSource, MemoryStore, attachment, contains, encode_image, load_record,
        load_schema,
    },
};

fn settings(scratch_root: &std::path::Path) -> Settings {
    Settings {
        scratch_root: scratch_root.to_owned(),
        output_filename: "generated.pdf".into(),
        web_base: url::Url::parse("https://airtable.com/").unwrap(),
        presign_ttl: Duration::from_secs(600),
    }
}

fn job(view_id: &str) -> JobRequest {
    JobRequest {
        base_id: "app1".into(),
        record_id: "rec1".into(),
        table_id: "tblSubmissions".into(),
        target_attachment_field_name_or_id: "fldPdf".into(),
        view_id: view_id.into(),
    }
}

#[tokio::test]
async fn renders_uploads_and_attaches_signed_url() {
    let mut record = load_record().await;
    record.fields.insert(
        "fldImages".into(),
        serde_json::json!([attachment("att1", "photo.png", "image/png")]),
    );
    let source = FakeSource::new(record, load_schema().await);
    let fetcher =
        FakeFetcher::default().serve("https://dl.test/att1", encode_image(image::ImageFormat::Png));
    let store = MemoryStore::default();
    let scratch = tempfile::tempdir().unwrap();
    let settings = settings(scratch.path());
    let pipeline = Pipeline {
        source: &source,
        fetcher: &fetcher,
        store: &store,
        settings: &settings,
    };

    let rendered = pipeline.run(&job("viwFull")).await.unwrap();

    assert_eq!(
        rendered.url.as_str(),
        "https://store.test/app1/tblSubmissions/rec1/generated.pdf?expires=600"
    );
    assert_eq!(
        rendered.notices,
        [Notice::OmittedField {
            field_id: "fldTags".into(),
            field_name: "Tags".into(),
            shape: Shape::List,
        }]
    );

    let (body, content_type, acl) = store
        .get("app1/tblSubmissions/rec1/generated.pdf")
        .await
        .unwrap();
    assert_eq!(content_type, "application/pdf");
    assert_eq!(acl, Acl::Private);
    assert!(body.starts_with(b"%PDF-"));
    assert!(contains(&body, "https://store.test/app1/tblSubmissions/rec1/att1__photo.png"));
    assert_eq!(
        store.get("app1/tblSubmissions/rec1/att1__photo.png").await.unwrap().2,
        Acl::PublicRead
    );

    let updates = source.updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "rec1");
    assert_eq!(
        updates[0].1["fldPdf"],
        serde_json::json!([{ "url": rendered.url.as_str() }])
    );
    assert!(
        scratch
            .path()
            .join("app1/tblSubmissions/rec1/generated.pdf")
            .exists()
    );
}

#[tokio::test]
async fn unknown_view_fails_before_rendering() {
    let source = FakeSource::new(load_record().await, load_schema().await);
    let fetcher = FakeFetcher::default();
    let store = MemoryStore::default();
    let scratch = tempfile::tempdir().unwrap();
    let settings = settings(scratch.path());
    let pipeline = Pipeline {
        source: &source,
        fetcher: &fetcher,
        store: &store,
        settings: &settings,
    };

    let error = pipeline.run(&job("viwMissing")).await.unwrap_err();
    assert!(matches!(error, Error::Schema(_)));
    assert!(store.keys().await.is_empty());
    assert!(source.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn attachment_failure_surfaces_as_attachment_error() {
    let mut record = load_record().await;
    record.fields.insert(
        "fldRefs".into(),
        serde_json::json!([
            attachment("att1", "a.txt", "text/plain"),
            attachment("att2", "b.txt", "text/plain"),
        ]),
    );
    let source = FakeSource::new(record, load_schema().await);
    let fetcher = FakeFetcher::default()
        .serve("https://dl.test/att1", &b"a"[..])
        .fail("https://dl.test/att2");
    let store = MemoryStore::default();
    let scratch = tempfile::tempdir().unwrap();
    let settings = settings(scratch.path());
    let pipeline = Pipeline {
        source: &source,
        fetcher: &fetcher,
        store: &store,
        settings: &settings,
    };

    let error = pipeline.run(&job("viwFull")).await.unwrap_err();
    assert!(matches!(error, Error::Attachment(ref error) if error.id == "att2"));
    assert!(
        store
            .get("app1/tblSubmissions/rec1/generated.pdf")
            .await
            .is_none()
    );
    assert!(source.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn traversal_in_ids_is_rejected() {
    let source = FakeSource::new(load_record().await, load_schema().await);
    let fetcher = FakeFetcher::default();
    let store = MemoryStore::default();
    let scratch = tempfile::tempdir().unwrap();
    let settings = settings(scratch.path());
    let pipeline = Pipeline {
        source: &source,
        fetcher: &fetcher,
        store: &store,
        settings: &settings,
    };
    let mut request = job("viwFull");
    request.base_id = "..".into();

    let error = pipeline.run(&request).await.unwrap_err();
    assert!(matches!(error, Error::Path(_)));
}
