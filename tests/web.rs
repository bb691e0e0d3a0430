mod common;

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use common::{ScriptedDecoder, activity, memory_db};
use fitvault::config::Config;
use fitvault::processing::FitImporter;
use fitvault::{AppState, USER_ID_HEADER, build_app};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "fitvault-test-boundary";

async fn scripted_app(config: Config) -> Router {
    let db = memory_db().await;
    let importer = FitImporter::with_decoder(db, Arc::new(ScriptedDecoder::new(activity(4))));
    build_app(AppState { importer, config })
}

async fn real_app() -> Router {
    build_app(AppState::new(memory_db().await, Config::default()))
}

fn multipart(filename: &str, bytes: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(uri: &str, user: Option<Uuid>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(uri: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn landing_page_responds() {
    let app = real_app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let app = real_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=--boundary")
        .header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .body(Body::from("----boundary--"))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_requires_a_user() {
    let app = scripted_app(Config::default()).await;
    let response = app
        .oneshot(upload("/api/imports", None, multipart("run.fit", b"abc", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn non_fit_files_are_rejected() {
    let app = scripted_app(Config::default()).await;
    let response = app
        .oneshot(upload(
            "/api/imports",
            Some(Uuid::new_v4()),
            multipart("run.gpx", b"<gpx/>", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["details"], "Only .fit files are supported");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let config = Config {
        max_upload_bytes: 16,
        ..Config::default()
    };
    let app = scripted_app(config).await;
    let response = app
        .oneshot(upload(
            "/api/imports",
            Some(Uuid::new_v4()),
            multipart("big.fit", &[0u8; 64], &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_upload_is_a_bad_request() {
    let app = real_app().await;
    let response = app
        .oneshot(upload(
            "/api/imports",
            Some(Uuid::new_v4()),
            multipart("broken.fit", b"definitely not a FIT file", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "invalid_fit_file");
}

#[tokio::test]
async fn import_then_list_and_fetch() {
    let app = scripted_app(Config::default()).await;
    let user = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(upload(
            "/api/imports",
            Some(user),
            multipart("Morning Run.FIT", b"fit-bytes", &[("session_id", "17")]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = json(response).await;
    assert_eq!(created["status"], "success");
    assert_eq!(created["workout"]["session_id"], 17);
    assert_eq!(created["workout"]["sport"], "running");
    assert!(created["warnings"].as_array().unwrap().is_empty());
    let import_id = created["import_id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get("/api/imports", user)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json(response).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["original_filename"], "Morning Run.FIT");
    assert_eq!(listed[0]["status"], "completed");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/imports/{import_id}"), user))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stranger = Uuid::new_v4();
    let response = app
        .oneshot(get(&format!("/api/imports/{import_id}"), stranger))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repeated_upload_reports_duplicate() {
    let app = scripted_app(Config::default()).await;
    let user = Uuid::new_v4();

    let first = app
        .clone()
        .oneshot(upload("/api/imports", Some(user), multipart("a.fit", b"same", &[])))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json(first).await;

    let second = app
        .oneshot(upload("/api/imports", Some(user), multipart("b.fit", b"same", &[])))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = json(second).await;

    assert_eq!(second["status"], "duplicate");
    assert_eq!(second["import_id"], first["import_id"]);
    assert_eq!(second["warnings"][0], "Duplicate file detected: b.fit");
}

#[tokio::test]
async fn html_upload_renders_summary() {
    let app = scripted_app(Config::default()).await;
    let response = app
        .oneshot(upload(
            "/upload",
            Some(Uuid::new_v4()),
            multipart("run.fit", b"html", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Running (Trail)"));
    assert!(html.contains("run.fit"));
}
