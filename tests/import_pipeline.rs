//! End-to-end tests for the import pipeline against a mock instance

mod common;

use common::{TestApp, png_bytes};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUSES_PATH: &str = "/api/v1/accounts/1/statuses";

fn plain_status(id: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "created_at": "2024-05-01T12:00:00Z",
        "visibility": "public",
        "url": format!("https://example.social/@user/{id}"),
        "content": content,
        "media_attachments": []
    })
}

async fn mount_statuses(server: &MockServer, statuses: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(STATUSES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sync_twice_is_idempotent() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    // Once the cursor sits at 10, the server has nothing newer.
    Mock::given(method("GET"))
        .and(path(STATUSES_PATH))
        .and(query_param("since_id", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;
    mount_statuses(&app.server, json!([plain_status("10", "<p>Hello world</p>")])).await;

    let first = app.state.importer.sync().await.unwrap();
    assert_eq!(first.imported, 1);

    let second = app.state.importer.sync().await.unwrap();
    assert_eq!(second.fetched, 0);
    assert_eq!(second.imported, 0);

    assert_eq!(app.state.db.count_entries().await.unwrap(), 1);
}

#[tokio::test]
async fn same_url_under_new_remote_id_is_deduplicated() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    // After importing 10, the server re-presents the same canonical URL
    // under a fresh remote ID (instance migration re-assigns IDs).
    let mut duplicate = plain_status("99", "<p>Hello world</p>");
    duplicate["url"] = json!("https://example.social/@user/10");
    Mock::given(method("GET"))
        .and(path(STATUSES_PATH))
        .and(query_param("since_id", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([duplicate])))
        .mount(&app.server)
        .await;
    mount_statuses(&app.server, json!([plain_status("10", "<p>Hello world</p>")])).await;

    app.state.importer.sync().await.unwrap();
    let second = app.state.importer.sync().await.unwrap();

    assert_eq!(second.fetched, 1);
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(app.state.db.count_entries().await.unwrap(), 1);
}

#[tokio::test]
async fn batch_is_imported_oldest_first_and_cursor_lands_on_newest() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    // Newest first, as the remote API orders its timeline.
    mount_statuses(
        &app.server,
        json!([
            plain_status("3", "<p>three</p>"),
            plain_status("2", "<p>two</p>"),
            plain_status("1", "<p>one</p>"),
        ]),
    )
    .await;

    app.state.importer.sync().await.unwrap();

    let entries = app.state.db.get_entries().await.unwrap();
    let source_ids: Vec<&str> = entries.iter().map(|e| e.source_id.as_str()).collect();
    assert_eq!(source_ids, vec!["1", "2", "3"]);

    let credential = app.state.db.get_credential().await.unwrap();
    assert_eq!(credential.latest_remote_id.as_deref(), Some("3"));
}

#[tokio::test]
async fn direct_messages_are_never_imported() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    let mut direct = plain_status("10", "<p>psst, a secret</p>");
    direct["visibility"] = json!("direct");
    mount_statuses(&app.server, json!([direct])).await;

    let outcome = app.state.importer.sync().await.unwrap();

    assert_eq!(outcome.imported, 0);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(app.state.db.count_entries().await.unwrap(), 0);
}

#[tokio::test]
async fn denylist_matches_case_insensitively() {
    let app = TestApp::with_config(|config| {
        config.import.denylist = vec!["spam".to_string()];
    })
    .await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    mount_statuses(
        &app.server,
        json!([
            plain_status("11", "<p>Buy SPAM today</p>"),
            plain_status("10", "<p>a perfectly fine status</p>"),
        ]),
    )
    .await;

    let outcome = app.state.importer.sync().await.unwrap();

    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.skipped, 1);
    let entries = app.state.db.get_entries().await.unwrap();
    assert_eq!(entries[0].source_id, "10");
}

#[tokio::test]
async fn media_rescues_empty_body_but_nothing_rescues_plain_emptiness() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    // 10: empty once sanitized, no media -> dropped.
    // 11: empty boost, but it carries an image -> imported.
    let mut with_media = plain_status("11", "");
    with_media["reblog"] = json!({
        "id": "5",
        "url": "https://other.example/@author/5",
        "account": { "id": "2", "username": "author" }
    });
    with_media["media_attachments"] = json!([
        { "type": "image", "url": format!("{}/files/photo1.png", app.server.uri()) }
    ]);
    mount_statuses(
        &app.server,
        json!([with_media, plain_status("10", "<p><img src=\"x\"></p>")]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/files/photo1.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .mount(&app.server)
        .await;

    let outcome = app.state.importer.sync().await.unwrap();

    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.media_stored, 1);

    let entries = app.state.db.get_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source_id, "11");
    // A media-only boost has no body; the canonical URL stands in as
    // the title.
    assert_eq!(entries[0].body, "");
    assert_eq!(entries[0].title, "https://other.example/@author/5");
}

#[tokio::test]
async fn fetch_failure_aborts_without_touching_the_cursor() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;
    app.state.db.set_latest_remote_id("7").await.unwrap();

    Mock::given(method("GET"))
        .and(path(STATUSES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.server)
        .await;

    let error = app.state.importer.sync().await.unwrap_err();
    assert!(matches!(
        error,
        fedimirror::error::ImportError::Transport(_)
    ));

    let credential = app.state.db.get_credential().await.unwrap();
    assert_eq!(credential.latest_remote_id.as_deref(), Some("7"));
    assert_eq!(app.state.db.count_entries().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_attachment_does_not_roll_back_the_entry() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    let mut status = plain_status("10", "<p>two pictures</p>");
    status["media_attachments"] = json!([
        { "type": "image", "url": format!("{}/files/broken.png", app.server.uri()) },
        { "type": "image", "url": format!("{}/files/good.png", app.server.uri()) },
    ]);
    mount_statuses(&app.server, json!([status])).await;

    Mock::given(method("GET"))
        .and(path("/files/broken.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/good.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .mount(&app.server)
        .await;

    let outcome = app.state.importer.sync().await.unwrap();

    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.media_stored, 1);
    assert_eq!(outcome.media_failed, 1);

    // The surviving attachment is the first successful one, so it is
    // still the featured image.
    let entries = app.state.db.get_entries().await.unwrap();
    let media = app
        .state
        .db
        .find_media_by_file_name("good.png")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entries[0].featured_media_id.as_deref(), Some(media.id.as_str()));
}

#[tokio::test]
async fn end_to_end_backfill_with_boost_and_featured_image() {
    let app = TestApp::new().await;
    app.seed_authorized().await;
    app.mount_verify_credentials().await;

    // Newest first: 11 is a boost of 5 (one image), 10 is plain text.
    let mut boost = plain_status("11", "<p>Worth resharing</p>");
    boost["reblog"] = json!({
        "id": "5",
        "url": "https://other.example/@author/5",
        "account": { "id": "2", "username": "author" }
    });
    boost["media_attachments"] = json!([
        {
            "type": "image",
            "url": format!("{}/files/photo1.png", app.server.uri()),
            "description": "A photo of a photo"
        }
    ]);
    mount_statuses(
        &app.server,
        json!([boost, plain_status("10", "<p>Hello world</p>")]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/files/photo1.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .mount(&app.server)
        .await;

    let outcome = app.state.importer.sync().await.unwrap();

    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.imported, 2);
    assert_eq!(outcome.media_stored, 1);

    let entries = app.state.db.get_entries().await.unwrap();
    assert_eq!(entries.len(), 2);

    // Chronological creation order: 10 first, then 11.
    assert_eq!(entries[0].source_id, "10");
    assert_eq!(entries[0].title, "Hello world");
    assert_eq!(entries[0].body, "Hello world");
    assert_eq!(entries[0].source_url, "https://example.social/@user/10");

    // The boost points at the original's URL and carries attribution.
    assert_eq!(entries[1].source_id, "11");
    assert_eq!(entries[1].source_url, "https://other.example/@author/5");
    assert!(entries[1].body.starts_with("<blockquote>Worth resharing"));
    assert!(entries[1].body.contains(">author</a>"));

    let credential = app.state.db.get_credential().await.unwrap();
    assert_eq!(credential.latest_remote_id.as_deref(), Some("11"));

    // The image landed in the library, with a rendition, and became
    // entry 11's featured image.
    let media = app
        .state
        .db
        .find_media_by_file_name("photo1.png")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(media.alt_text, "A photo of a photo");
    assert_eq!(media.content_type, "image/png");
    assert_eq!(entries[1].featured_media_id.as_deref(), Some(media.id.as_str()));

    let media_dir = &app.state.config.media.directory;
    assert!(media_dir.join("photo1.png").is_file());
    assert!(media_dir.join("photo1-thumb.png").is_file());
}
