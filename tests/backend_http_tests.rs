//! HttpBackend tests against a mock build server.

use std::time::Duration;

use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;

use ffdroid_builder::backend::{BackendApi, HttpBackend};
use ffdroid_builder::config::ConfigPayload;
use ffdroid_builder::models::{Configuration, LogLevel};
use ffdroid_builder::BackendError;

fn backend(server: &mockito::ServerGuard) -> HttpBackend {
    HttpBackend::new(server.url(), Duration::from_secs(5)).unwrap()
}

fn payload() -> ConfigPayload {
    ConfigPayload::from(Configuration::default())
}

#[tokio::test]
async fn test_fetch_presets_fills_ids() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/presets")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "basic": {"name": "基础", "description": "h264 + aac", "config": {"decoders": ["h264", "aac"]}},
                "full": {"name": "完整", "config": {"optimizations": {"enableSmall": true}}}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let presets = backend(&server).fetch_presets().await.unwrap();
    mock.assert_async().await;

    assert_eq!(presets.len(), 2);
    assert_eq!(presets["basic"].id, "basic");
    assert_eq!(
        presets["basic"].config.decoders,
        Some(vec!["h264".to_string(), "aac".to_string()])
    );
    let full = presets["full"].config.optimizations.clone().unwrap();
    assert_eq!(full.enable_small, Some(true));
    assert_eq!(full.disable_asm, None);
}

#[tokio::test]
async fn test_fetch_unknown_preset_uses_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/preset/nope")
        .with_status(404)
        .with_body(json!({"error": "预设不存在"}).to_string())
        .create_async()
        .await;

    let err = backend(&server).fetch_preset("nope").await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(ref reason) if reason == "预设不存在"));
}

#[tokio::test]
async fn test_save_config_posts_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/save-config")
        .match_body(Matcher::PartialJson(json!({
            "preset": "basic",
            "outputType": "shared",
            "optimizations": {"enablePic": true}
        })))
        .with_status(200)
        .with_body(json!({"success": true}).to_string())
        .create_async()
        .await;

    backend(&server).save_config(&payload()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_script_returns_path() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate-script")
        .with_status(200)
        .with_body(json!({"success": true, "script_path": "/srv/build.sh"}).to_string())
        .create_async()
        .await;

    let path = backend(&server).generate_script(&payload()).await.unwrap();
    assert_eq!(path, "/srv/build.sh");
}

#[tokio::test]
async fn test_start_rejection_carries_reason() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/start-compilation")
        .with_status(200)
        .with_body(json!({"success": false, "error": "编译已在进行"}).to_string())
        .create_async()
        .await;

    let err = backend(&server).start_compilation(&payload()).await.unwrap_err();
    assert_eq!(err.to_string(), "编译已在进行");
}

#[tokio::test]
async fn test_compilation_status_snapshot() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/compilation-status")
        .with_status(200)
        .with_body(json!({"running": true, "status": "编译中", "progress": 45}).to_string())
        .create_async()
        .await;

    let status = backend(&server).compilation_status().await.unwrap();
    assert!(status.running);
    assert_eq!(status.progress, 45);
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn test_server_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/compilation-status")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let err = backend(&server).compilation_status().await.unwrap_err();
    assert!(matches!(err, BackendError::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_fetch_and_clear_logs() {
    let mut server = mockito::Server::new_async().await;
    let _logs = server
        .mock("GET", "/api/logs")
        .with_status(200)
        .with_body(
            json!({"success": true, "logs": [
                {"timestamp": "10:00:00", "level": "warning", "message": "slow"},
                {"timestamp": "10:00:01", "level": "trace", "message": "odd level"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let clear = server
        .mock("POST", "/api/logs/clear")
        .with_status(200)
        .with_body(json!({"success": true}).to_string())
        .create_async()
        .await;

    let backend = backend(&server);
    let logs = backend.fetch_logs().await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].level, LogLevel::Warning);
    assert_eq!(logs[1].level, LogLevel::Other("trace".to_string()));

    backend.clear_logs().await.unwrap();
    clear.assert_async().await;
}

#[tokio::test]
async fn test_log_stream_yields_payloads() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"type\": \"connected\"}\n\n",
        ": comment\n",
        "data: {\"timestamp\": \"10:00:00\", \"level\": \"info\", \"message\": \"one\"}\n\n",
        "data: {\"timestamp\": \"10:00:01\", \"level\": \"info\", \"message\": \"two\"}\n\n",
    );
    let _mock = server
        .mock("GET", "/api/logs/stream")
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let stream = backend(&server).open_log_stream().await.unwrap();
    let payloads: Vec<String> = stream.filter_map(|item| async move { item.ok() }).collect().await;

    assert_eq!(payloads.len(), 3);
    assert_eq!(payloads[0], "{\"type\": \"connected\"}");
    assert!(payloads[2].contains("two"));
}

#[tokio::test]
async fn test_log_stream_http_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/logs/stream")
        .with_status(503)
        .create_async()
        .await;

    let result = backend(&server).open_log_stream().await;
    assert!(matches!(result, Err(BackendError::HttpStatus { status: 503, .. })));
}
