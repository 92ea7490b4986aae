//! HttpFetcher against a local axum server

use axum::http::{header::USER_AGENT, HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wxr_import::fetcher::{HttpFetcher, RemoteFetcher};
use wxr_import::FetchError;

const PHOTO: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4];

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/files/photo.jpg", get(|| async { PHOTO.to_vec() }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .route("/moved", get(|| async { Redirect::permanent("/files/photo.jpg") }))
        .route(
            "/agent",
            get(|headers: HeaderMap| async move {
                headers
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new("wxr-import-test/1.0", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_body_streamed_to_file() {
    let base = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("photo.jpg");
    let url = format!("{}/files/photo.jpg", base);

    let response = fetcher().fetch_to_file(&url, &dest).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content_length, Some(PHOTO.len() as u64));
    assert_eq!(response.final_url.as_deref(), Some(url.as_str()));
    assert_eq!(std::fs::read(&dest).unwrap(), PHOTO);
}

#[tokio::test]
async fn test_error_status_reported_without_body() {
    let base = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing");

    let response = fetcher()
        .fetch_to_file(&format!("{}/missing", base), &dest)
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_redirect_followed_and_final_url_reported() {
    let base = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("moved.jpg");

    let response = fetcher()
        .fetch_to_file(&format!("{}/moved", base), &dest)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        response.final_url,
        Some(format!("{}/files/photo.jpg", base))
    );
    assert_eq!(std::fs::read(&dest).unwrap(), PHOTO);
}

#[tokio::test]
async fn test_configured_user_agent_sent() {
    let base = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("agent.txt");

    fetcher()
        .fetch_to_file(&format!("{}/agent", base), &dest)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "wxr-import-test/1.0");
}

#[tokio::test]
async fn test_closed_port_is_no_response() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let result = fetcher()
        .fetch_to_file(&format!("http://{}/anything", addr), &dir.path().join("x"))
        .await;

    assert!(matches!(result, Err(FetchError::NoResponse(_))));
}

/// Serves one chunked response that announces 16 bytes, sends 8, then hangs up
async fn spawn_truncating_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nTransfer-Encoding: chunked\r\n\r\n10\r\n",
            )
            .await
            .unwrap();
        socket.write_all(&PHOTO).await.unwrap();
        socket.flush().await.unwrap();
        drop(socket);
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_truncated_chunked_body_is_an_error() {
    let base = spawn_truncating_server().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("photo.jpg");

    let result = fetcher()
        .fetch_to_file(&format!("{}/files/photo.jpg", base), &dest)
        .await;

    assert!(
        matches!(result, Err(FetchError::NoResponse(_))),
        "expected NoResponse, got {:?}",
        result
    );
}
