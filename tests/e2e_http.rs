use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autobrowse::{
    AutoGrow, BufferContainer, HttpTransport, PageRequest, ScrollSignal, SessionPhase,
    TailViewport, TemplateRenderer, Transport, items_at,
};

#[tokio::test]
async fn test_posts_to_offset_and_count_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items/0/20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [1, 2, 3] })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("create transport");
    let url = format!("{}/items/", server.uri());
    let page = transport
        .fetch(&url, PageRequest::new(0, 20))
        .await
        .expect("fetch should succeed");

    assert_eq!(page, json!({ "items": [1, 2, 3] }));
}

#[tokio::test]
async fn test_error_status_fails_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items/40/20"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("create transport");
    let err = transport
        .fetch(&format!("{}/items", server.uri()), PageRequest::new(40, 20))
        .await
        .expect_err("503 should fail");

    assert!(format!("{:#}", err).contains("503"));
}

#[tokio::test]
async fn test_non_json_body_fails_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items/0/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("create transport");
    let result = transport
        .fetch(&format!("{}/items", server.uri()), PageRequest::new(0, 5))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let transport =
        HttpTransport::with_timeout(Duration::from_millis(200)).expect("create transport");
    let result = transport
        .fetch(&format!("{}/items", server.uri()), PageRequest::new(0, 5))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_session_pulls_until_exhausted_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feed/0/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "a" }, { "name": "b" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/feed/2/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "c & d" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let container = Arc::new(BufferContainer::new());
    let viewport = Arc::new(TailViewport::new(container.clone(), 40));

    let session = AutoGrow::builder(format!("{}/feed", server.uri()))
        .count(2)
        .total_count(3)
        .http_transport(Duration::from_secs(5))
        .expect("create transport")
        .renderer(TemplateRenderer::new("<li>{{ name }}</li>").with_items_pointer("/items"))
        .items_returned(items_at("/items"))
        .container(container.clone())
        .viewport(viewport)
        .build()
        .expect("build session");

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(session.run(rx));

    while tx.send(ScrollSignal).await.is_ok() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let report = handle.await.expect("join").expect("run");
    assert_eq!(report.phase, SessionPhase::Exhausted);
    assert_eq!(report.offset, 3);
    assert_eq!(
        container.fragments(),
        vec![
            "<li>a</li>\n<li>b</li>".to_string(),
            "<li>c &amp; d</li>".to_string()
        ]
    );
}
