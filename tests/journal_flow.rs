//! End-to-end journal tests against a real Postgres. Ignored by default;
//! run with `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use profile_api::images::LocalImageStore;
use profile_api::models::journal::{fields, EntryDraft, JournalEntry};
use profile_api::store::{collections, DocFilter, Store};
use profile_api::{app, AppState};

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test")
}

async fn db_app() -> axum::Router {
    let store = Store::connect_lazy(&database_url()).expect("pool");
    store.ensure_collections().await.expect("collections");
    let images = Arc::new(LocalImageStore::new(std::env::temp_dir()));
    app(AppState { store, images })
}

async fn json_response(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Register a fresh user and return the session cookie from login.
async fn register_and_login(app: &axum::Router) -> String {
    let email = format!("{}@example.com", uuid::Uuid::new_v4());

    let (status, _) = json_response(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                None,
                json!({ "name": "Flow Tester", "email": email, "password": "hunter2" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let login = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);

    login
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
#[ignore = "needs a running Postgres"]
async fn journal_lifecycle() {
    let app = db_app().await;
    let cookie = register_and_login(&app).await;

    // Create, then append a second revision
    let (status, created) = json_response(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/journal",
                Some(&cookie),
                json!({ "title": "v1", "content": "first draft" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["version"], 1);
    assert_eq!(created["status"], "pending");
    let journal_id = created["journalID"].as_str().expect("journal id").to_string();

    let (status, appended) = json_response(
        app.clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/journal/{}", journal_id),
                Some(&cookie),
                json!({ "title": "v2", "content": "second draft" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(appended["version"], 2);
    assert_eq!(appended["entries"].as_array().map(Vec::len), Some(2));

    // Authenticated read sees full history, anonymous only the latest entry
    let (_, owner_view) = json_response(
        app.clone()
            .oneshot(
                Request::get(format!("/api/v1/journal/{}", journal_id))
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(owner_view["entries"].as_array().map(Vec::len), Some(2));

    let (_, anon_view) = json_response(
        app.clone()
            .oneshot(
                Request::get(format!("/api/v1/journal/{}", journal_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(anon_view["entries"].as_array().map(Vec::len), Some(1));
    assert_eq!(anon_view["entries"][0]["title"], "v2");

    // Publish and find it in the public listing
    let (status, _) = json_response(
        app.clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/journal/{}/status", journal_id),
                Some(&cookie),
                json!({ "status": "public" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listing) = json_response(
        app.clone()
            .oneshot(
                Request::get(format!("/api/v1/journal?user={}", created["userID"].as_str().unwrap()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    let listed = listing
        .as_array()
        .expect("listing array")
        .iter()
        .any(|j| j["journalID"] == journal_id.as_str());
    assert!(listed, "published journal should appear in the public listing");

    // Delete, then confirm it is gone
    let (status, _) = json_response(
        app.clone()
            .oneshot(
                Request::delete(format!("/api/v1/journal/{}", journal_id))
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = json_response(
        app.clone()
            .oneshot(
                Request::get(format!("/api/v1/journal/{}/meta", journal_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting something already gone still reports success
    let (status, body) = json_response(
        app.clone()
            .oneshot(
                Request::delete(format!("/api/v1/journal/{}", journal_id))
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Journal entry deleted");
}

#[tokio::test]
#[ignore = "needs a running Postgres"]
async fn concurrent_appends_never_share_a_version() {
    let app = db_app().await;
    let cookie = register_and_login(&app).await;

    let (status, created) = json_response(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/journal",
                Some(&cookie),
                json!({ "title": "v1", "content": "base" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let journal_id = created["journalID"].as_str().expect("journal id").to_string();

    // Two writers race on the same aggregate; the loser must retry against
    // the committed state instead of reusing the version number.
    let uri = format!("/api/v1/journal/{}", journal_id);
    let first = app.clone().oneshot(json_request(
        "PUT",
        &uri,
        Some(&cookie),
        json!({ "title": "left", "content": "left" }),
    ));
    let second = app.clone().oneshot(json_request(
        "PUT",
        &uri,
        Some(&cookie),
        json!({ "title": "right", "content": "right" }),
    ));
    let (first, second) = tokio::join!(first, second);

    let (status_a, a) = json_response(first.unwrap()).await;
    let (status_b, b) = json_response(second.unwrap()).await;
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);

    let va = a["version"].as_u64().expect("version");
    let vb = b["version"].as_u64().expect("version");
    assert_ne!(va, vb, "concurrent appends must not share a version");

    let (_, doc) = json_response(
        app.clone()
            .oneshot(
                Request::get(uri)
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    let versions: Vec<u64> = doc["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
#[ignore = "needs a running Postgres"]
async fn append_write_is_conditional_on_the_pointer() {
    let store = Store::connect_lazy(&database_url()).expect("pool");
    store.ensure_collections().await.expect("collections");
    let journals = store.collection::<JournalEntry>(collections::JOURNAL);

    let mut journal = JournalEntry::create(
        "guard-user",
        EntryDraft {
            title: "v1".to_string(),
            content: "base".to_string(),
            attachments: vec![],
        },
    );
    journals.insert_one(&journal).await.expect("insert");
    let id = journal.journal_id.clone();

    let stale = DocFilter::new()
        .eq(fields::JOURNAL_ID, id.as_str())
        .eq(fields::USER_ID, "guard-user")
        .eq(fields::VERSION, 99);
    let current = DocFilter::new()
        .eq(fields::JOURNAL_ID, id.as_str())
        .eq(fields::USER_ID, "guard-user")
        .eq(fields::VERSION, 1);

    journal.append(EntryDraft {
        title: "v2".to_string(),
        content: "next".to_string(),
        attachments: vec![],
    });

    // A writer whose pointer read is outdated must not commit
    assert_eq!(journals.replace_one(stale, &journal).await.expect("cas"), 0);
    // The writer that read the live pointer does
    assert_eq!(journals.replace_one(current, &journal).await.expect("cas"), 1);

    journals
        .delete_one(DocFilter::new().eq(fields::JOURNAL_ID, id.as_str()))
        .await
        .expect("cleanup");
}
