// SPDX-License-Identifier: GPL-3.0-or-later

//! Last.fm API client implementation.
//!
//! Last.fm payloads are loosely typed: counters arrive as strings, and a list
//! with one element is sometimes a bare object. Responses are therefore read
//! through `serde_json::Value` instead of fixed structs.

use crate::error::{ProviderError, Result};
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::rate_limiter::RequestQueues;
use crate::text::{clean_lastfm_text, non_blank};
use crate::{MetadataProvider, SimilarArtistsSource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sleeve_domain::{
    AlbumData, AlbumQuery, Appended, ArtistData, ArtistQuery, Link, Ranked, SimilarArtist,
    SourceInfo, SourcedResult, TagList, Tier, Track,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "lastfm";
pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0";

const SIMILAR_LIMIT: &str = "20";

#[derive(Debug, Clone)]
pub struct LastFmProvider {
    http: ProviderHttp,
}

impl LastFmProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    async fn call(
        &self,
        method: &str,
        params: &[(&str, &str)],
        token: &CancellationToken,
    ) -> Result<Option<Value>> {
        let api_key = self
            .http
            .api_key()
            .ok_or(ProviderError::MissingField("api_key"))?;
        if self.http.cancelled(token, method) {
            return Ok(None);
        }

        let url = self.http.url("/");
        debug!(target: "lastfm", method, "calling Last.fm");
        let request = self
            .http
            .get(&url)
            .query(&[
                ("method", method),
                ("api_key", api_key),
                ("format", "json"),
                ("autocorrect", "1"),
            ])
            .query(params);
        Ok(Some(self.http.send_json(request).await?))
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn fetch_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<ArtistData>> {
        let params = artist_params(query);
        let Some(body) = self.call("artist.getinfo", &params, token).await? else {
            return Ok(None);
        };
        let artist = body
            .get("artist")
            .ok_or(ProviderError::MissingField("artist"))?;

        let bio = text_at(artist, &["bio", "content"]).and_then(|text| clean_lastfm_text(&text));
        let bio_summary =
            text_at(artist, &["bio", "summary"]).and_then(|text| clean_lastfm_text(&text));
        let similar: Vec<SimilarArtist> = items(artist.get("similar").and_then(|s| s.get("artist")))
            .filter_map(similar_artist)
            .collect();
        let mut links = Appended::default();
        if let Some(url) = text_at(artist, &["url"]) {
            links.push(Link::new(NAME, url));
        }

        Ok(Some(ArtistData {
            name: text_at(artist, &["name"]),
            mbid: text_at(artist, &["mbid"]),
            bio,
            bio_summary,
            tags: tag_list(artist),
            similar_artists: Ranked::from(similar),
            links,
            listeners: number_at(artist, &["stats", "listeners"]),
            ..ArtistData::default()
        }))
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        let params: Vec<(&str, &str)> = match query.mbid.as_deref() {
            Some(mbid) => vec![("mbid", mbid)],
            None => vec![("artist", query.artist.as_str()), ("album", query.title.as_str())],
        };
        let Some(body) = self.call("album.getinfo", &params, token).await? else {
            return Ok(None);
        };
        let album = body
            .get("album")
            .ok_or(ProviderError::MissingField("album"))?;

        let tracks: Vec<Track> = items(album.get("tracks").and_then(|t| t.get("track")))
            .filter_map(|track| {
                Some(Track {
                    position: number_at(track, &["@attr", "rank"]).map(|rank| rank.to_string()),
                    title: text_at(track, &["name"])?,
                    duration_secs: number_at(track, &["duration"])
                        .and_then(|secs| u32::try_from(secs).ok())
                        .filter(|secs| *secs > 0),
                })
            })
            .collect();
        let description =
            text_at(album, &["wiki", "content"]).and_then(|text| clean_lastfm_text(&text));
        let description_summary =
            text_at(album, &["wiki", "summary"]).and_then(|text| clean_lastfm_text(&text));
        let mut links = Appended::default();
        if let Some(url) = text_at(album, &["url"]) {
            links.push(Link::new(NAME, url));
        }

        Ok(Some(AlbumData {
            title: text_at(album, &["name"]),
            artist: text_at(album, &["artist"]),
            mbid: text_at(album, &["mbid"]),
            description,
            description_summary,
            tags: tag_list(album),
            track_count: u32::try_from(tracks.len()).ok().filter(|count| *count > 0),
            tracks: Ranked::from(tracks),
            links,
            cover_url: largest_image(album),
            ..AlbumData::default()
        }))
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn fetch_similar(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<Vec<SimilarArtist>>> {
        let mut params = artist_params(query);
        params.push(("limit", SIMILAR_LIMIT));
        let Some(body) = self.call("artist.getsimilar", &params, token).await? else {
            return Ok(None);
        };

        let similar: Vec<SimilarArtist> =
            items(body.get("similarartists").and_then(|s| s.get("artist")))
                .filter_map(similar_artist)
                .collect();
        Ok((!similar.is_empty()).then_some(similar))
    }
}

#[async_trait]
impl MetadataProvider for LastFmProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Community)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let data = settle(NAME, "artist_info", self.fetch_artist(query, token).await)?;
        SourcedResult::new(data, MetadataProvider::source(self))
    }

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, MetadataProvider::source(self))
    }
}

#[async_trait]
impl SimilarArtistsSource for LastFmProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Community)
    }

    async fn similar_artists(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<Vec<SimilarArtist>> {
        settle(NAME, "similar_artists", self.fetch_similar(query, token).await)
    }
}

fn artist_params(query: &ArtistQuery) -> Vec<(&str, &str)> {
    match query.mbid.as_deref() {
        Some(mbid) => vec![("mbid", mbid)],
        None => vec![("artist", query.name.as_str())],
    }
}

/// Array elements, a lone object as a one-element list, nothing otherwise.
fn items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    let slice: &[Value] = match value {
        Some(Value::Array(items)) => items,
        Some(item @ Value::Object(_)) => std::slice::from_ref(item),
        _ => &[],
    };
    slice.iter()
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    let text = lookup(value, path)?.as_str()?;
    non_blank(Some(text.to_string()))
}

fn number_at(value: &Value, path: &[&str]) -> Option<u64> {
    match lookup(value, path)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn tag_list(value: &Value) -> TagList {
    items(value.get("tags").and_then(|tags| tags.get("tag")))
        .filter_map(|tag| text_at(tag, &["name"]))
        .collect()
}

fn similar_artist(value: &Value) -> Option<SimilarArtist> {
    Some(SimilarArtist {
        name: text_at(value, &["name"])?,
        mbid: text_at(value, &["mbid"]),
        url: text_at(value, &["url"]),
    })
}

fn largest_image(value: &Value) -> Option<String> {
    const SIZES: [&str; 4] = ["mega", "extralarge", "large", "medium"];
    let images: Vec<&Value> = items(value.get("image")).collect();
    SIZES.iter().find_map(|size| {
        images
            .iter()
            .find(|image| image.get("size").and_then(Value::as_str) == Some(*size))
            .and_then(|image| text_at(image, &["#text"]))
    })
}
