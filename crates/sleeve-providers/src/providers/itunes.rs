// SPDX-License-Identifier: GPL-3.0-or-later

//! iTunes Search API. Album search, a lookup for the track listing, and
//! artwork taken from the search hit.

use crate::error::Result;
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::matching::{best_match, match_score};
use crate::rate_limiter::RequestQueues;
use crate::text::non_blank;
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sleeve_domain::{
    AlbumData, AlbumQuery, Appended, ImageData, ImageKind, Link, Ranked, SourceInfo,
    SourcedResult, TagList, Tier, Track,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "itunes";
pub const DEFAULT_BASE_URL: &str = "https://itunes.apple.com";

const ARTWORK_SIZE: u32 = 600;

#[derive(Debug, Clone)]
pub struct ITunesProvider {
    http: ProviderHttp,
}

impl ITunesProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    #[instrument(skip(self), fields(artist = %query.artist, album = %query.title))]
    async fn search_album(&self, query: &AlbumQuery) -> Result<Option<Collection>> {
        let url = self.http.url("/search");
        let term = format!("{} {}", query.artist, query.title);
        let request = self.http.get(&url).query(&[
            ("term", term.as_str()),
            ("media", "music"),
            ("entity", "album"),
            ("limit", "10"),
        ]);
        let response: ITunesResponse = self.http.send(request).await?;

        let collections = response
            .results
            .into_iter()
            .filter(|item| item.collection_name.is_some())
            .collect();
        Ok(best_match(collections, |item: &Collection| {
            match_score(item.collection_name.as_deref().unwrap_or_default(), &query.title)
                + match_score(item.artist_name.as_deref().unwrap_or_default(), &query.artist)
        }))
    }

    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        let Some(collection) = self.search_album(query).await? else {
            return Ok(None);
        };

        let mut tracks = Vec::new();
        if let Some(collection_id) = collection.collection_id {
            if self.http.cancelled(token, "track lookup") {
                return Ok(None);
            }
            let url = self.http.url("/lookup");
            let id = collection_id.to_string();
            debug!(target: "itunes", collection_id, "looking up album tracks");
            let request = self
                .http
                .get(&url)
                .query(&[("id", id.as_str()), ("entity", "song")]);
            let lookup: ITunesResponse = self.http.send(request).await?;
            tracks = lookup
                .results
                .into_iter()
                .filter(|item| item.wrapper_type.as_deref() == Some("track"))
                .filter_map(|item| {
                    Some(Track {
                        position: item.track_number.map(|number| match item.disc_number {
                            Some(disc) if disc > 1 => format!("{disc}-{number}"),
                            _ => number.to_string(),
                        }),
                        title: item.track_name?,
                        duration_secs: item
                            .track_time_millis
                            .and_then(|ms| u32::try_from(ms / 1_000).ok()),
                    })
                })
                .collect();
        }

        let release_date = non_blank(collection.release_date.clone())
            .map(|date| date.get(..10).map(str::to_string).unwrap_or(date));
        let year = release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok());
        let mut links = Appended::default();
        if let Some(url) = non_blank(collection.collection_view_url.clone()) {
            links.push(Link::new(NAME, url));
        }

        Ok(Some(AlbumData {
            title: collection.collection_name.clone(),
            artist: collection.artist_name.clone(),
            release_date,
            year,
            country: non_blank(collection.country.clone()),
            track_count: collection.track_count,
            genres: collection.primary_genre_name.clone().into_iter().collect::<TagList>(),
            tracks: Ranked::from(tracks),
            links,
            cover_url: collection.artwork_url(),
            ..AlbumData::default()
        }))
    }

    async fn fetch_cover(&self, query: &AlbumQuery) -> Result<Option<ImageData>> {
        let collection = self.search_album(query).await?;
        Ok(collection.and_then(|collection| collection.artwork_url()).map(|url| {
            ImageData::new(url, ImageKind::Cover).with_size(ARTWORK_SIZE, ARTWORK_SIZE)
        }))
    }
}

#[async_trait]
impl MetadataProvider for ITunesProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Commercial)
    }

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, self.source())
    }

    async fn album_cover(
        &self,
        query: &AlbumQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let image = settle(NAME, "album_cover", self.fetch_cover(query).await)?;
        SourcedResult::new(image, self.source())
    }
}

/// Artwork URLs embed their pixel size; the 100px variant is upscaled.
fn upscale_artwork(url: &str) -> String {
    url.replace("100x100bb", &format!("{ARTWORK_SIZE}x{ARTWORK_SIZE}bb"))
}

#[derive(Debug, Deserialize)]
struct ITunesResponse {
    #[serde(default)]
    results: Vec<Collection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Collection {
    wrapper_type: Option<String>,
    collection_id: Option<u64>,
    collection_name: Option<String>,
    artist_name: Option<String>,
    artwork_url100: Option<String>,
    release_date: Option<String>,
    primary_genre_name: Option<String>,
    track_count: Option<u32>,
    country: Option<String>,
    collection_view_url: Option<String>,
    track_name: Option<String>,
    track_number: Option<u32>,
    disc_number: Option<u32>,
    track_time_millis: Option<u64>,
}

impl Collection {
    fn artwork_url(&self) -> Option<String> {
        non_blank(self.artwork_url100.clone()).map(|url| upscale_artwork(&url))
    }
}
