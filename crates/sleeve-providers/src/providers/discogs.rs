// SPDX-License-Identifier: GPL-3.0-or-later

//! Discogs database API: search followed by an artist or release detail call.

use crate::error::{ProviderError, Result};
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::matching::{best_match, match_score};
use crate::rate_limiter::RequestQueues;
use crate::text::{clean_discogs_markup, first_sentence, non_blank, strip_discogs_suffix};
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use sleeve_domain::{
    AlbumData, AlbumQuery, Appended, ArtistData, ArtistQuery, Credit, Link, Rating, Ranked,
    SourceInfo, SourcedResult, TagList, Tier, Track,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "discogs";
pub const DEFAULT_BASE_URL: &str = "https://api.discogs.com";

#[derive(Debug, Clone)]
pub struct DiscogsProvider {
    http: ProviderHttp,
}

impl DiscogsProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        debug!(target: "discogs", base_url = %settings.base_url, "initialized Discogs provider");
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        match self.http.api_key() {
            // Discogs uses its own scheme rather than Bearer: "Discogs token=<value>".
            Some(token) => request.header("Authorization", format!("Discogs token={token}")),
            None => request,
        }
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn fetch_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<ArtistData>> {
        let search_url = self.http.url("/database/search");
        debug!(target: "discogs", url = %search_url, "searching Discogs artist metadata");
        let request = self
            .request(&search_url)
            .query(&[("type", "artist"), ("q", query.name.as_str())]);
        let search: SearchResponse = self.http.send(request).await?;

        // Raw titles are scored: a homonym such as "Nirvana (2)" only
        // contains the query, so an exact "Nirvana" outranks it.
        let Some(hit) = best_match(search.results, |item| {
            item.title
                .as_deref()
                .map_or(0, |title| match_score(title, &query.name))
        }) else {
            return Ok(None);
        };
        let artist_id = hit.id.ok_or(ProviderError::MissingField("results[].id"))?;
        if self.http.cancelled(token, "artist detail") {
            return Ok(None);
        }

        let artist_url = self.http.url(&format!("/artists/{artist_id}"));
        debug!(target: "discogs", url = %artist_url, "fetching Discogs artist detail");
        let detail: ArtistDetail = self.http.send(self.request(&artist_url)).await?;

        let bio = detail.profile.as_deref().and_then(clean_discogs_markup);
        let members: Vec<String> = detail
            .members
            .into_iter()
            .map(|member| strip_discogs_suffix(&member.name))
            .collect();
        let links = detail
            .urls
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Link::new(link_label(&url), url))
            .collect();
        let image_url = detail
            .images
            .iter()
            .find(|image| image.kind.as_deref() == Some("primary"))
            .or_else(|| detail.images.first())
            .map(|image| image.uri.clone())
            .or_else(|| non_blank(hit.cover_image));

        Ok(Some(ArtistData {
            name: detail
                .name
                .or_else(|| hit.title.clone())
                .map(|name| strip_discogs_suffix(&name)),
            bio_summary: bio.as_deref().map(first_sentence),
            bio,
            members: Ranked::from(members),
            links,
            image_url,
            ..ArtistData::default()
        }))
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        let search_url = self.http.url("/database/search");
        debug!(target: "discogs", url = %search_url, "searching Discogs album metadata");
        let request = self.request(&search_url).query(&[
            ("type", "release"),
            ("artist", query.artist.as_str()),
            ("release_title", query.title.as_str()),
        ]);
        let search: SearchResponse = self.http.send(request).await?;

        // Release titles come back as "Artist - Title".
        let Some(hit) = best_match(search.results, |item| {
            let title = item.title.as_deref().unwrap_or_default();
            let (artist, album) = title.split_once(" - ").unwrap_or(("", title));
            match_score(album, &query.title) + match_score(artist, &query.artist)
        }) else {
            return Ok(None);
        };
        let release_id = hit.id.ok_or(ProviderError::MissingField("results[].id"))?;
        if self.http.cancelled(token, "release detail") {
            return Ok(None);
        }

        let release_url = self.http.url(&format!("/releases/{release_id}"));
        debug!(target: "discogs", url = %release_url, "fetching Discogs release detail");
        let detail: ReleaseDetail = self.http.send(self.request(&release_url)).await?;

        let artist = detail
            .artists
            .first()
            .map(|artist| strip_discogs_suffix(&artist.name))
            .or_else(|| Some(query.artist.clone()));
        let tracks: Vec<Track> = detail
            .tracklist
            .into_iter()
            .filter(|track| track.kind.as_deref().map_or(true, |kind| kind == "track"))
            .map(|track| Track {
                position: non_blank(track.position),
                duration_secs: track.duration.as_deref().and_then(parse_duration),
                title: track.title,
            })
            .collect();
        let credits = detail
            .extraartists
            .into_iter()
            .map(|credit| Credit {
                name: strip_discogs_suffix(&credit.name),
                role: non_blank(credit.role),
            })
            .collect();
        let description = detail.notes.as_deref().and_then(clean_discogs_markup);
        let rating = detail
            .community
            .and_then(|community| community.rating)
            .filter(|rating| rating.count.unwrap_or(0) > 0)
            .map(|rating| Rating {
                value: rating.average,
                votes: rating.count,
            });
        let mut links = Appended::default();
        if let Some(uri) = non_blank(detail.uri) {
            links.push(Link::new(NAME, uri));
        }

        Ok(Some(AlbumData {
            title: detail.title.or_else(|| Some(query.title.clone())),
            artist,
            release_date: non_blank(detail.released),
            year: detail.year.filter(|year| *year > 0).or(hit.year_number()),
            label: detail.labels.into_iter().next().map(|label| label.name),
            country: non_blank(detail.country),
            track_count: u32::try_from(tracks.len()).ok().filter(|count| *count > 0),
            description_summary: description.as_deref().map(first_sentence),
            description,
            genres: TagList::from(detail.genres),
            tags: TagList::from(detail.styles),
            tracks: Ranked::from(tracks),
            credits,
            links,
            rating,
            cover_url: non_blank(hit.cover_image),
            ..AlbumData::default()
        }))
    }
}

#[async_trait]
impl MetadataProvider for DiscogsProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Professional)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let data = settle(NAME, "artist_info", self.fetch_artist(query, token).await)?;
        SourcedResult::new(data, self.source())
    }

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, self.source())
    }
}

/// "4:23" or "1:02:03" to seconds.
fn parse_duration(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value
        .split(':')
        .try_fold(0u32, |total, part| Some(total * 60 + part.trim().parse::<u32>().ok()?))
}

fn link_label(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "website".to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResultItem {
    id: Option<u64>,
    title: Option<String>,
    // A string in search results, a number elsewhere.
    year: Option<Value>,
    cover_image: Option<String>,
}

impl SearchResultItem {
    fn year_number(&self) -> Option<i32> {
        match self.year.as_ref()? {
            Value::Number(year) => year.as_i64().and_then(|year| i32::try_from(year).ok()),
            Value::String(year) => year.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DiscogsImage {
    #[serde(rename = "type")]
    kind: Option<String>,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ArtistDetail {
    name: Option<String>,
    profile: Option<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    members: Vec<NamedRef>,
    #[serde(default)]
    images: Vec<DiscogsImage>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    position: Option<String>,
    title: String,
    duration: Option<String>,
    #[serde(rename = "type_")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtraArtist {
    name: String,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommunityRating {
    average: f32,
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Community {
    rating: Option<CommunityRating>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDetail {
    title: Option<String>,
    year: Option<i32>,
    released: Option<String>,
    country: Option<String>,
    notes: Option<String>,
    uri: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    styles: Vec<String>,
    #[serde(default)]
    artists: Vec<NamedRef>,
    #[serde(default)]
    labels: Vec<NamedRef>,
    #[serde(default)]
    tracklist: Vec<TrackItem>,
    #[serde(default)]
    extraartists: Vec<ExtraArtist>,
    community: Option<Community>,
}
