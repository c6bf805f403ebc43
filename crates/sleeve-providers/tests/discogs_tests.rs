// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use common::{client, keyed_settings, queues};
use serde_json::json;
use sleeve_domain::{AlbumQuery, ArtistQuery};
use sleeve_providers::{DiscogsProvider, MetadataProvider};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> DiscogsProvider {
    DiscogsProvider::new(client(), queues(), keyed_settings(server, "test-token"))
}

#[tokio::test]
async fn test_artist_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/database/search"))
        .and(query_param("type", "artist"))
        .and(query_param("q", "Nirvana"))
        .and(header("authorization", "Discogs token=test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": 7, "title": "Nirvana (2)" },
                { "id": 42, "title": "Nirvana" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/artists/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Nirvana (2)",
            "profile": "British psychedelic band from the 1960s."
        })))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/artists/42"))
        .and(header("authorization", "Discogs token=test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Nirvana",
            "profile": "American rock band formed by [a=Kurt Cobain] and [a=Krist Novoselic]. They signed to [l=Sub Pop].",
            "urls": ["https://www.nirvana.com"],
            "members": [{ "name": "Kurt Cobain" }, { "name": "Dave Grohl" }],
            "images": [
                { "type": "secondary", "uri": "https://img.discogs.example/2.jpg" },
                { "type": "primary", "uri": "https://img.discogs.example/1.jpg" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Nirvana"), &CancellationToken::new())
        .await
        .expect("artist found");

    let artist = result.data();
    assert_eq!(result.source().name, "discogs");
    // The exact title beats the homonym listed first.
    assert_eq!(artist.name.as_deref(), Some("Nirvana"));
    assert_eq!(
        artist.bio.as_deref(),
        Some("American rock band formed by Kurt Cobain and Krist Novoselic. They signed to Sub Pop.")
    );
    assert_eq!(
        artist.bio_summary.as_deref(),
        Some("American rock band formed by Kurt Cobain and Krist Novoselic.")
    );
    assert_eq!(&artist.members[..], &["Kurt Cobain".to_string(), "Dave Grohl".to_string()]);
    assert_eq!(artist.links[0].label, "nirvana.com");
    assert_eq!(artist.image_url.as_deref(), Some("https://img.discogs.example/1.jpg"));
}

#[tokio::test]
async fn test_album_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/database/search"))
        .and(query_param("type", "release"))
        .and(query_param("artist", "Nirvana"))
        .and(query_param("release_title", "Nevermind"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": 1, "title": "Nirvana - Nevermind Demos", "year": "1990" },
                { "id": 99, "title": "Nirvana - Nevermind", "year": "1991",
                  "cover_image": "https://img.discogs.example/nevermind.jpg" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/releases/99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Nevermind",
            "year": 1991,
            "country": "US",
            "genres": ["Rock"],
            "styles": ["Grunge", "Alternative Rock"],
            "artists": [{ "name": "Nirvana" }],
            "labels": [{ "name": "DGC" }],
            "tracklist": [
                { "position": "A1", "title": "Smells Like Teen Spirit", "duration": "5:01", "type_": "track" },
                { "position": "", "title": "Side B", "duration": "", "type_": "heading" },
                { "position": "B1", "title": "Drain You", "duration": "3:43", "type_": "track" }
            ],
            "extraartists": [{ "name": "Butch Vig", "role": "Producer" }],
            "community": { "rating": { "average": 4.6, "count": 1200 } },
            "uri": "https://www.discogs.com/release/99"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .album_info(&AlbumQuery::new("Nirvana", "Nevermind"), &CancellationToken::new())
        .await
        .expect("album found");

    let album = result.data();
    assert_eq!(album.year, Some(1991));
    assert_eq!(album.label.as_deref(), Some("DGC"));
    assert!(album.genres.contains("rock"));
    assert!(album.tags.contains("grunge"));
    assert_eq!(album.tracks.len(), 2);
    assert_eq!(album.tracks[0].duration_secs, Some(301));
    assert_eq!(album.track_count, Some(2));
    assert_eq!(album.credits[0].role.as_deref(), Some("Producer"));
    assert_eq!(album.rating.as_ref().map(|rating| rating.votes), Some(Some(1200)));
    assert_eq!(album.cover_url.as_deref(), Some("https://img.discogs.example/nevermind.jpg"));
}

#[tokio::test]
async fn test_api_error_message_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/database/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "You are making requests too quickly."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Nirvana"), &CancellationToken::new())
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn test_detail_not_found_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/database/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": 5, "title": "Nirvana" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/artists/5"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Artist not found." })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Nirvana"), &CancellationToken::new())
        .await;

    assert!(result.is_none());
}
