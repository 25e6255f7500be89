//! End-to-end tests for the bundled request guards.

mod common;

use reqwest::StatusCode;
use routeway::middleware::{json_body, require_content_type, require_header};
use routeway::{handler_fn, handlers, Reply, Request, Routes, Server};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
}

const MISSING_HEADER: &str = r#"Header "X-Requested-With" must be sent."#;

fn guarded_server() -> Server {
    let mut server = Server::new();
    server
        .middleware(handlers![
            require_header("X-Requested-With", MISSING_HEADER),
            handlers![
                require_content_type("application/json"),
                handlers![handlers![json_body::<User>()]],
            ],
        ])
        .post(
            "/User",
            handler_fn(|req: Request| async move {
                let user: User = req.json_as().await?;
                Reply::new().json(&user)
            }),
        );
    server
}

#[tokio::test]
async fn valid_request_is_echoed() {
    let (running, base) = common::start(guarded_server()).await;

    let resp = common::client()
        .post(format!("{base}/User"))
        .header("X-Requested-With", "XMLHttpRequest")
        .header("Content-Type", "application/json")
        .body(r#"{"name":"Frank"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = resp.json().await.unwrap();
    assert_eq!(user.name, "Frank");

    running.close().await;
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let (running, base) = common::start(guarded_server()).await;

    let resp = common::client()
        .post(format!("{base}/User"))
        .header("Content-Type", "application/json")
        .body(r#"{"name":"Frank"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), MISSING_HEADER);

    running.close().await;
}

#[tokio::test]
async fn wrong_content_type_is_rejected() {
    let (running, base) = common::start(guarded_server()).await;

    let resp = common::client()
        .post(format!("{base}/User"))
        .header("X-Requested-With", "XMLHttpRequest")
        .header("Content-Type", "text/plain")
        .body(r#"{"name":"Frank"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"Header "Content-Type" must be "application/json"."#
    );

    running.close().await;
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (running, base) = common::start(guarded_server()).await;

    let resp = common::client()
        .post(format!("{base}/User"))
        .header("X-Requested-With", "XMLHttpRequest")
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!resp.text().await.unwrap().is_empty());

    running.close().await;
}
