use academy_core::Attachment;
use academy_infra::{ApiClient, ApiError, ApiErrorKind, UploadRequest, Uploader};
use axum::extract::Multipart;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use reqwest::Method;
use serde_json::json;
use std::net::SocketAddr;

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/api/wrapped",
            get(|| async { Body::from(r#"{"ok":true,"data":[{"id":1},{"id":2}],"message":"ok"}"#) }),
        )
        .route(
            "/api/bare",
            get(|| async { Body::from(r#"[{"id":1},{"id":2}]"#) }),
        )
        .route(
            "/api/refused",
            get(|| async { Body::from(r#"{"ok":false,"message":"title already used"}"#) }),
        )
        .route(
            "/api/broken",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Body::from(r#"{"message":"database down"}"#),
                )
            }),
        )
        .route("/api/empty", post(|| async { Body::empty() }))
        .route(
            "/api/whoami",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Body::from(json!({ "auth": auth }).to_string())
            }),
        )
        .route(
            "/api/uploads",
            post(|mut multipart: Multipart| async move {
                let mut folder = String::new();
                let mut file_name = String::new();
                let mut size = 0usize;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    match field.name().unwrap_or_default() {
                        "data" => {
                            let text = field.text().await.unwrap();
                            let meta: serde_json::Value = serde_json::from_str(&text).unwrap();
                            folder = meta["folder"].as_str().unwrap_or_default().to_string();
                        }
                        "file" => {
                            file_name = field.file_name().unwrap_or_default().to_string();
                            size = field.bytes().await.unwrap().len();
                        }
                        _ => {}
                    }
                }
                Body::from(
                    json!({
                        "ok": true,
                        "data": { "url": format!("https://cdn.test/{folder}/{file_name}?size={size}") }
                    })
                    .to_string(),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn client(addr: SocketAddr, token: Option<&str>) -> ApiClient {
    ApiClient::new(
        reqwest::Client::new(),
        &format!("http://{addr}/api"),
        token.map(str::to_string),
    )
    .unwrap()
}

#[tokio::test]
async fn wrapped_and_bare_payloads_normalize_to_the_same_value() {
    let (addr, handle) = start_server().await;
    let api = client(addr, None);

    let wrapped = api.fetch_api(Method::GET, &["wrapped"], None).await.unwrap();
    let bare = api.fetch_api(Method::GET, &["bare"], None).await.unwrap();
    assert_eq!(wrapped, bare);
    assert_eq!(wrapped, Some(json!([{"id": 1}, {"id": 2}])));

    handle.abort();
}

#[tokio::test]
async fn ok_false_and_error_status_are_api_errors() {
    let (addr, handle) = start_server().await;
    let api = client(addr, None);

    let refused = api.fetch_api(Method::GET, &["refused"], None).await.unwrap_err();
    assert!(matches!(refused, ApiError::Rejected(ref m) if m == "title already used"));
    assert_eq!(refused.kind(), ApiErrorKind::Api);

    let broken = api.fetch_api(Method::GET, &["broken"], None).await.unwrap_err();
    match broken {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn empty_success_body_is_no_payload() {
    let (addr, handle) = start_server().await;
    let api = client(addr, None);
    let out = api
        .fetch_api(Method::POST, &["empty"], Some(&json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(out, None);
    handle.abort();
}

#[tokio::test]
async fn connection_refused_is_a_connectivity_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr, None);
    let err = api.fetch_api(Method::GET, &["wrapped"], None).await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Connectivity);
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let (addr, handle) = start_server().await;
    let api = client(addr, Some("s3cret"));
    let out = api
        .fetch_api(Method::GET, &["whoami"], None)
        .await
        .unwrap()
        .expect("payload");
    assert_eq!(out["auth"], "Bearer s3cret");
    handle.abort();
}

#[tokio::test]
async fn uploads_send_metadata_and_file_parts() {
    let (addr, handle) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    let notes = dir.path().join("notes.pdf");
    std::fs::write(&clip, b"0123456789").unwrap();
    std::fs::write(&notes, b"%PDF").unwrap();

    let uploader = Uploader::new(client(addr, None), 2);
    let reqs = vec![
        UploadRequest::for_attachment(&Attachment::new(clip.to_str().unwrap())),
        UploadRequest::for_attachment(&Attachment::new(notes.to_str().unwrap())),
    ];
    let results = uploader.upload_batch(reqs).await;

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.folder, "videos");
    assert_eq!(first.url, "https://cdn.test/videos/clip.mp4?size=10");
    assert_eq!(first.bytes, 10);
    let second = results[1].as_ref().unwrap();
    assert_eq!(second.url, "https://cdn.test/documents/notes.pdf?size=4");

    handle.abort();
}

#[tokio::test]
async fn missing_file_fails_only_its_own_upload() {
    let (addr, handle) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("cover.png");
    std::fs::write(&real, b"png").unwrap();

    let uploader = Uploader::new(client(addr, None), 4);
    let results = uploader
        .upload_batch(vec![
            UploadRequest::for_attachment(&Attachment::new("/definitely/not/here.mp4")),
            UploadRequest::for_attachment(&Attachment::new(real.to_str().unwrap())),
        ])
        .await;

    assert!(matches!(results[0], Err(ApiError::Io(_))));
    assert!(results[1].is_ok());
    handle.abort();
}
