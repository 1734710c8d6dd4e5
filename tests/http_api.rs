use axum::body::{ to_bytes, Body };
use axum::http::{ header, Request, StatusCode };
use axum::Router;
use chat_tail::aggregator::LastMessageAggregator;
use chat_tail::server::api::{ router, AppState, LAST_MESSAGES_PATH };
use serde_json::{ json, Value };
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

fn create_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let aggregator = LastMessageAggregator::new(temp_dir.path(), 8);
    (router(AppState::new(aggregator, 0)), temp_dir)
}

fn write_log(root: &Path, character: &str, file: &str, content: &str) {
    let dir = root.join("chats").join(character);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

async fn post(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::post(LAST_MESSAGES_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn returns_newest_chat_first() {
    let (app, temp_dir) = create_test_app();
    write_log(temp_dir.path(), "foo", "a.jsonl", "{\"user_name\":\"You\"}\n{\"send_date\":100,\"mes\":\"hi\"}\n");
    write_log(temp_dir.path(), "foo", "b.jsonl", "{\"user_name\":\"You\"}\n{\"send_date\":200,\"mes\":\"yo\"}\n");

    let (status, body) = post(app, r#"{"character_avatar":"foo.png"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "chatLastMessages": [
                { "chatFileId": "b", "lastMessage": { "send_date": 200, "mes": "yo" } },
                { "chatFileId": "a", "lastMessage": { "send_date": 100, "mes": "hi" } }
            ]
        })
    );
}

#[tokio::test]
async fn missing_directory_is_an_empty_success() {
    let (app, _temp_dir) = create_test_app();
    let (status, body) = post(app, r#"{"character_avatar":"ghost.webp"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "chatLastMessages": [] }));
}

#[tokio::test]
async fn missing_avatar_is_a_bad_request() {
    for payload in ["{}", r#"{"character_avatar":""}"#, ""] {
        let (app, _temp_dir) = create_test_app();
        let (status, body) = post(app, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload:?}");
        assert_eq!(body, json!({ "success": false, "error": "character_avatar is required." }));
    }
}

#[tokio::test]
async fn malformed_body_and_traversal_are_rejected() {
    let (app, _temp_dir) = create_test_app();
    let (status, body) = post(app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body.");

    let (app, _temp_dir) = create_test_app();
    let (status, body) = post(app, r#"{"character_avatar":"../../etc.png"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "character_avatar is invalid.");
}

#[tokio::test]
async fn corrupt_file_is_skipped_without_error() {
    let (app, temp_dir) = create_test_app();
    write_log(temp_dir.path(), "foo", "bad.jsonl", "{}\n{\"send_date\":300,\"mes\":");
    write_log(temp_dir.path(), "foo", "good.jsonl", "{}\n{\"send_date\":10,\"mes\":\"ok\"}\n");

    let (status, body) = post(app, r#"{"character_avatar":"foo.png"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let chats = body["chatLastMessages"].as_array().unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["chatFileId"], "good");
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_directory_is_a_server_error() {
    let (app, temp_dir) = create_test_app();
    fs::create_dir_all(temp_dir.path().join("chats")).unwrap();
    fs::write(temp_dir.path().join("chats").join("foo"), "a file, not a directory").unwrap();

    let (status, body) = post(app, r#"{"character_avatar":"foo.png"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "success": false, "error": "Failed to read character chat directory." }));
}

#[tokio::test]
async fn unknown_routes_are_json_404() {
    let (app, _temp_dir) = create_test_app();
    let request = Request::get("/nope").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
