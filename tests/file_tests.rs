//! End-to-end tests for file responses and static directories.

mod common;

use reqwest::StatusCode;
use routeway::{Outcome, Routes, Server, StaticDir};
use tempfile::TempDir;

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
    std::fs::write(dir.path().join("big.bin"), vec![7u8; 200 * 1024]).unwrap();
    dir
}

#[tokio::test]
async fn file_is_served_with_type_and_etag() {
    let dir = site();
    let mut server = Server::new();
    server.get("/index", Outcome::file(dir.path().join("index.html")));
    let (running, base) = common::start(server).await;
    let client = common::client();

    let resp = client.get(format!("{base}/index")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/html; charset=utf-8");
    let etag = resp.headers()["etag"].to_str().unwrap().to_owned();
    assert_eq!(resp.text().await.unwrap(), "<h1>hi</h1>");

    let resp = client
        .get(format!("{base}/index"))
        .header("If-None-Match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(resp.text().await.unwrap(), "");

    running.close().await;
}

#[tokio::test]
async fn large_file_arrives_whole() {
    let dir = site();
    let mut server = Server::new();
    server.get("/big", Outcome::file(dir.path().join("big.bin")));
    let (running, base) = common::start(server).await;

    let resp = common::client().get(format!("{base}/big")).send().await.unwrap();
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), 200 * 1024);
    assert!(body.iter().all(|b| *b == 7));

    running.close().await;
}

#[tokio::test]
async fn missing_file_is_bad_request() {
    let dir = site();
    let mut server = Server::new();
    server.get("/gone", Outcome::file(dir.path().join("gone.txt")));
    let (running, base) = common::start(server).await;

    let resp = common::client().get(format!("{base}/gone")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!resp.headers().contains_key("etag"));
    assert_eq!(resp.text().await.unwrap(), "");

    running.close().await;
}

#[tokio::test]
async fn unreadable_file_is_internal_error() {
    let dir = site();
    let mut server = Server::new();
    server.get("/dir", Outcome::file(dir.path()));
    let (running, base) = common::start(server).await;

    let resp = common::client().get(format!("{base}/dir")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!resp.headers().contains_key("etag"));
    assert_eq!(resp.text().await.unwrap(), "");

    running.close().await;
}

#[tokio::test]
async fn static_dir_serves_below_its_root() {
    let dir = site();
    let mut server = Server::new();
    server.get("/static/:file", StaticDir::new(dir.path()));
    let (running, base) = common::start(server).await;
    let client = common::client();

    let resp = client.get(format!("{base}/static/index.html")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<h1>hi</h1>");

    let resp = client.get(format!("{base}/static/nope.css")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    running.close().await;
}
