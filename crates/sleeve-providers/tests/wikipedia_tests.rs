// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use common::{client, queues, settings};
use serde_json::json;
use sleeve_providers::{BiographySource, WikipediaProvider};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> WikipediaProvider {
    WikipediaProvider::new(client(), queues(), settings(server))
}

#[tokio::test]
async fn test_summary_by_article_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/OK_Computer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "title": "OK Computer",
            "extract": "OK Computer is the third studio album by Radiohead. It was released in 1997.",
            "content_urls": {
                "desktop": { "page": "https://en.wikipedia.org/wiki/OK_Computer" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = provider(&server)
        .summary_by_reference(
            "https://en.wikipedia.org/wiki/OK_Computer",
            &CancellationToken::new(),
        )
        .await
        .expect("summary found");

    assert_eq!(
        summary.text,
        "OK Computer is the third studio album by Radiohead. It was released in 1997."
    );
    assert_eq!(
        summary.summary.as_deref(),
        Some("OK Computer is the third studio album by Radiohead.")
    );
    assert_eq!(
        summary.url.as_deref(),
        Some("https://en.wikipedia.org/wiki/OK_Computer")
    );
}

#[tokio::test]
async fn test_search_then_summary() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/rest.php/v1/search/page"))
        .and(query_param("q", "Radiohead (band)"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pages": [{ "key": "Radiohead", "title": "Radiohead" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Radiohead"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "extract": "Radiohead are an English rock band formed in Abingdon in 1985."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = provider(&server)
        .search_summary("Radiohead (band)", &CancellationToken::new())
        .await
        .expect("summary found");

    assert!(summary.text.starts_with("Radiohead are an English rock band"));
    assert_eq!(summary.url, None);
}

#[tokio::test]
async fn test_disambiguation_page_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "disambiguation",
            "extract": "Mercury may refer to:"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = provider(&server)
        .summary_by_reference("Mercury", &CancellationToken::new())
        .await;

    assert!(summary.is_none());
}

#[tokio::test]
async fn test_empty_search_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/rest.php/v1/search/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pages": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = provider(&server)
        .search_summary("zzzz no such page", &CancellationToken::new())
        .await;

    assert!(summary.is_none());
}

#[tokio::test]
async fn test_foreign_url_reference_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = provider(&server)
        .summary_by_reference("https://example.org/radiohead", &CancellationToken::new())
        .await;

    assert!(summary.is_none());
}
