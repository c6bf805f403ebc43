// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use common::{client, queues, settings, OK_COMPUTER_MBID, RADIOHEAD_MBID};
use serde_json::json;
use sleeve_domain::{AlbumQuery, ArtistQuery, Tier};
use sleeve_providers::{MetadataProvider, MusicBrainzProvider};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> MusicBrainzProvider {
    MusicBrainzProvider::new(client(), queues(), settings(server))
}

#[tokio::test]
async fn test_artist_info_search_then_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artist"))
        .and(query_param("query", "artist:\"Radiohead\""))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": [
                { "id": "11111111-1111-1111-1111-111111111111", "name": "Radiohead Tribute" },
                { "id": RADIOHEAD_MBID, "name": "Radiohead" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/artist/{RADIOHEAD_MBID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": RADIOHEAD_MBID,
            "name": "Radiohead",
            "type": "Group",
            "country": "GB",
            "life-span": { "begin": "1985", "end": null },
            "tags": [
                { "name": "alternative rock", "count": 3 },
                { "name": "rock", "count": 9 }
            ],
            "genres": [{ "name": "art rock", "count": 4 }],
            "relations": [
                {
                    "type": "wikipedia",
                    "target-type": "url",
                    "url": { "resource": "https://en.wikipedia.org/wiki/Radiohead" }
                },
                {
                    "type": "official homepage",
                    "target-type": "url",
                    "url": { "resource": "https://www.radiohead.com/" }
                },
                {
                    "type": "member of band",
                    "target-type": "artist",
                    "direction": "backward",
                    "artist": { "name": "Thom Yorke" }
                },
                {
                    "type": "member of band",
                    "target-type": "artist",
                    "direction": "backward",
                    "artist": { "name": "Jonny Greenwood" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Radiohead"), &CancellationToken::new())
        .await
        .expect("artist found");

    assert_eq!(result.source().name, "musicbrainz");
    assert_eq!(result.source().tier, Tier::Professional);
    let artist = result.data();
    assert_eq!(artist.mbid.as_deref(), Some(RADIOHEAD_MBID));
    assert_eq!(artist.artist_type.as_deref(), Some("Group"));
    assert_eq!(artist.begin_date.as_deref(), Some("1985"));
    assert_eq!(artist.end_date, None);
    assert_eq!(&artist.tags[..], &["rock".to_string(), "alternative rock".to_string()]);
    assert!(artist.genres.contains("art rock"));
    assert_eq!(&artist.members[..], &["Thom Yorke".to_string(), "Jonny Greenwood".to_string()]);
    assert_eq!(
        artist.article_url.as_deref(),
        Some("https://en.wikipedia.org/wiki/Radiohead")
    );
    assert_eq!(artist.links.len(), 1);
    assert_eq!(artist.links[0].label, "official homepage");
}

#[tokio::test]
async fn test_album_info_with_mbid_skips_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release-group"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "release-groups": [] })))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/release-group/{OK_COMPUTER_MBID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": OK_COMPUTER_MBID,
            "title": "OK Computer",
            "primary-type": "Album",
            "first-release-date": "1997-05-21",
            "artist-credit": [{ "name": "Radiohead", "joinphrase": "" }],
            "tags": [{ "name": "alternative rock", "count": 5 }],
            "releases": [{ "id": "rel-1" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/release/rel-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "country": "GB",
            "label-info": [{ "label": { "name": "Parlophone" } }],
            "media": [{
                "tracks": [
                    { "number": "1", "title": "Airbag", "length": 284000 },
                    { "number": "2", "title": "Paranoid Android", "length": 383000 }
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = AlbumQuery::new("Radiohead", "OK Computer").with_mbid(OK_COMPUTER_MBID);
    let result = provider(&server)
        .album_info(&query, &CancellationToken::new())
        .await
        .expect("album found");

    let album = result.data();
    assert_eq!(album.title.as_deref(), Some("OK Computer"));
    assert_eq!(album.artist.as_deref(), Some("Radiohead"));
    assert_eq!(album.year, Some(1997));
    assert_eq!(album.label.as_deref(), Some("Parlophone"));
    assert_eq!(album.track_count, Some(2));
    assert_eq!(album.tracks[1].title, "Paranoid Android");
    assert_eq!(album.tracks[1].duration_secs, Some(383));
}

#[tokio::test]
async fn test_empty_search_returns_none_without_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "artists": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Nobody At All"), &CancellationToken::new())
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn test_http_error_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artist"))
        .respond_with(ResponseTemplate::new(503).set_body_string("slow down"))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Radiohead"), &CancellationToken::new())
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn test_lookup_with_only_identity_fields_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/artist/{RADIOHEAD_MBID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": RADIOHEAD_MBID,
            "name": "Radiohead"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ArtistQuery::new("Radiohead").with_mbid(RADIOHEAD_MBID);
    let result = provider(&server)
        .artist_info(&query, &CancellationToken::new())
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "artists": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let result = provider(&server)
        .artist_info(&ArtistQuery::new("Radiohead"), &token)
        .await;

    assert!(result.is_none());
}
