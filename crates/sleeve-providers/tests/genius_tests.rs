// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use common::{client, keyed_settings, queues};
use serde_json::json;
use sleeve_domain::ArtistQuery;
use sleeve_providers::{GeniusProvider, MetadataProvider};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> GeniusProvider {
    GeniusProvider::new(client(), queues(), keyed_settings(server, "genius-token"))
}

async fn mount_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Kendrick Lamar"))
        .and(header("authorization", "Bearer genius-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "status": 200 },
            "response": {
                "hits": [
                    { "result": { "primary_artist": { "id": 9, "name": "Kendrick Lamar Tribute" } } },
                    { "result": { "primary_artist": { "id": 1421, "name": "Kendrick Lamar" } } }
                ]
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_artist_description_and_links() {
    let server = MockServer::start().await;
    mount_search(&server).await;

    Mock::given(method("GET"))
        .and(path("/artists/1421"))
        .and(query_param("text_format", "plain"))
        .and(header("authorization", "Bearer genius-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "artist": {
                    "name": "Kendrick Lamar",
                    "url": "https://genius.com/artists/Kendrick-lamar",
                    "image_url": "https://images.genius.example/kendrick.jpg",
                    "twitter_name": "kendricklamar",
                    "instagram_name": null,
                    "description": { "plain": "Kendrick Lamar is a rapper from Compton. He won a Pulitzer Prize." }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Kendrick Lamar"), &CancellationToken::new())
        .await
        .expect("artist found");

    let artist = result.data();
    assert_eq!(artist.bio_summary.as_deref(), Some("Kendrick Lamar is a rapper from Compton."));
    assert_eq!(artist.links.len(), 2);
    assert_eq!(artist.links[1].url, "https://twitter.com/kendricklamar");
    assert_eq!(
        artist.image_url.as_deref(),
        Some("https://images.genius.example/kendrick.jpg")
    );
}

#[tokio::test]
async fn test_placeholder_description_is_dropped() {
    let server = MockServer::start().await;
    mount_search(&server).await;

    Mock::given(method("GET"))
        .and(path("/artists/1421"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "artist": {
                    "name": "Kendrick Lamar",
                    "image_url": "https://assets.genius.example/images/default_avatar_300.png",
                    "description": { "plain": "?" }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Kendrick Lamar"), &CancellationToken::new())
        .await;

    // Only the name survives, which is not enough to count as a result.
    assert!(result.is_none());
}

#[tokio::test]
async fn test_unauthorized_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_token",
            "error_description": "The access token provided is expired, revoked, malformed or invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Kendrick Lamar"), &CancellationToken::new())
        .await;

    assert!(result.is_none());
}
