use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn paged_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items/0/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "a" }, { "name": "b" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/items/2/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "c" }]
        })))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_help_shows_usage() {
    cargo_bin_cmd!("autobrowse")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("paged endpoint"));
}

#[test]
fn test_version_shows_version() {
    cargo_bin_cmd!("autobrowse")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autobrowse"));
}

#[test]
fn test_cache_show_with_empty_store() {
    let tmp_dir = TempDir::new().expect("create temp dir");
    let db = tmp_dir.path().join("storage.db");

    cargo_bin_cmd!("autobrowse")
        .args(["cache", "show", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached pages."));
}

#[test]
fn test_cache_clear_reports_namespace() {
    let tmp_dir = TempDir::new().expect("create temp dir");
    let db = tmp_dir.path().join("storage.db");

    cargo_bin_cmd!("autobrowse")
        .args(["cache", "clear", "--namespace", "feed", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared namespace: feed"));

    cargo_bin_cmd!("autobrowse")
        .args(["cache", "clear", "--all", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared all persisted keys."));
}

#[test]
fn test_pull_without_url_fails_gracefully() {
    let tmp_dir = TempDir::new().expect("create temp dir");

    cargo_bin_cmd!("autobrowse")
        .current_dir(tmp_dir.path())
        .arg("pull")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no url given"));
}

#[test]
fn test_pull_from_unreachable_endpoint_fails() {
    cargo_bin_cmd!("autobrowse")
        .args([
            "pull",
            "http://127.0.0.1:9/items",
            "--total",
            "5",
            "--timeout-secs",
            "2",
            "--interval-ms",
            "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_prints_pages_and_persists_them() {
    let server = paged_server().await;
    let tmp_dir = TempDir::new().expect("create temp dir");
    let db = tmp_dir.path().join("storage.db");
    let url = format!("{}/items", server.uri());

    let pull_db = db.clone();
    let pull_url = url.clone();
    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("autobrowse")
            .args(["pull", &pull_url])
            .args(["--count", "2", "--total", "3", "--interval-ms", "10"])
            .args(["--items-pointer", "/items", "--template", "<li>{{ name }}</li>"])
            .arg("--use-storage")
            .arg("--db")
            .arg(&pull_db)
            .assert()
            .success()
            .stdout(predicate::str::contains("<li>a</li>"))
            .stdout(predicate::str::contains("<li>c</li>"));
    })
    .await
    .expect("pull should finish");

    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("autobrowse")
            .args(["cache", "show", "--db"])
            .arg(&db)
            .assert()
            .success()
            .stdout(predicate::str::contains(url))
            .stdout(predicate::str::contains("pages:      2"))
            .stdout(predicate::str::contains("offset:     3"));
    })
    .await
    .expect("cache show should finish");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_reads_config_file() {
    let server = paged_server().await;
    let tmp_dir = TempDir::new().expect("create temp dir");
    let config = tmp_dir.path().join("feed.toml");
    std::fs::write(
        &config,
        format!(
            r#"url = "{}/items"

[options]
count = 2
total_count = 3

[render]
template = "<p>{{{{ name }}}}</p>"
items_pointer = "/items"
"#,
            server.uri()
        ),
    )
    .expect("write config");

    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("autobrowse")
            .arg("--config")
            .arg(&config)
            .args(["pull", "--interval-ms", "10"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<p>a</p>"))
            .stdout(predicate::str::contains("<p>c</p>"));
    })
    .await
    .expect("pull should finish");
}
