// SPDX-License-Identifier: GPL-3.0-or-later

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
    AlbumData, AlbumQuery, Appended, ArtistQuery, Credit, ImageData, ImageKind, Link, Ranked,
    SourceInfo, SourcedResult, TagList, Tier, Track,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "deezer";
pub const DEFAULT_BASE_URL: &str = "https://api.deezer.com";

/// Pixel size of the `_xl` picture variants.
const XL_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct DeezerProvider {
    http: ProviderHttp,
}

impl DeezerProvider {
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
    async fn search_album(&self, query: &AlbumQuery) -> Result<Option<AlbumHit>> {
        let url = self.http.url("/search/album");
        let term = format!("artist:\"{}\" album:\"{}\"", query.artist, query.title);
        let request = self.http.get(&url).query(&[("q", term.as_str())]);
        let search: SearchResponse<AlbumHit> = self.http.send(request).await?;

        Ok(best_match(search.data, |album| {
            match_score(&album.title, &query.title)
                + album
                    .artist
                    .as_ref()
                    .map_or(0, |artist| match_score(&artist.name, &query.artist))
        }))
    }

    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        let Some(hit) = self.search_album(query).await? else {
            return Ok(None);
        };
        if self.http.cancelled(token, "album detail") {
            return Ok(None);
        }

        let url = self.http.url(&format!("/album/{}", hit.id));
        debug!(target: "deezer", url = %url, "fetching album detail");
        let album: AlbumDetail = self.http.send(self.http.get(&url)).await?;

        let tracks: Vec<Track> = album
            .tracks
            .map(|tracks| tracks.data)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, track)| Track {
                position: Some((index + 1).to_string()),
                title: track.title,
                duration_secs: track.duration.filter(|secs| *secs > 0),
            })
            .collect();
        let genres: TagList = album
            .genres
            .map(|genres| genres.data)
            .unwrap_or_default()
            .into_iter()
            .map(|genre| genre.name)
            .collect();
        let credits = album
            .contributors
            .into_iter()
            .map(|contributor| Credit {
                name: contributor.name,
                role: non_blank(contributor.role),
            })
            .collect();
        let release_date = non_blank(album.release_date);
        let mut links = Appended::default();
        if let Some(link) = non_blank(album.link) {
            links.push(Link::new(NAME, link));
        }

        Ok(Some(AlbumData {
            title: album.title.or(Some(hit.title)),
            artist: album.artist.map(|artist| artist.name),
            album_type: non_blank(album.record_type),
            year: release_date
                .as_deref()
                .and_then(|date| date.get(..4))
                .and_then(|year| year.parse().ok()),
            release_date,
            label: non_blank(album.label),
            track_count: album.nb_tracks,
            genres,
            tracks: Ranked::from(tracks),
            credits,
            links,
            cover_url: real_picture(album.cover_xl.or(hit.cover_xl)),
            ..AlbumData::default()
        }))
    }

    async fn fetch_cover(&self, query: &AlbumQuery) -> Result<Option<ImageData>> {
        let hit = self.search_album(query).await?;
        Ok(hit
            .and_then(|album| real_picture(album.cover_xl))
            .map(|url| ImageData::new(url, ImageKind::Cover).with_size(XL_SIZE, XL_SIZE)))
    }

    #[instrument(skip(self), fields(artist = %query.name))]
    async fn fetch_artist_image(&self, query: &ArtistQuery) -> Result<Option<ImageData>> {
        let url = self.http.url("/search/artist");
        let request = self.http.get(&url).query(&[("q", query.name.as_str())]);
        let search: SearchResponse<ArtistHit> = self.http.send(request).await?;

        let artist = best_match(search.data, |artist| match_score(&artist.name, &query.name));
        Ok(artist
            .and_then(|artist| real_picture(artist.picture_xl))
            .map(|url| ImageData::new(url, ImageKind::Thumb).with_size(XL_SIZE, XL_SIZE)))
    }
}

#[async_trait]
impl MetadataProvider for DeezerProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Community)
    }

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, self.source())
    }

    async fn artist_image(
        &self,
        query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let image = settle(NAME, "artist_image", self.fetch_artist_image(query).await)?;
        SourcedResult::new(image, self.source())
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

/// Deezer serves a generic silhouette when it has no picture; its URL has an
/// empty hash segment (`/artist//` or `/cover//`).
fn real_picture(url: Option<String>) -> Option<String> {
    non_blank(url).filter(|url| !url.contains("/artist//") && !url.contains("/cover//"))
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistHit {
    name: String,
    picture_xl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumHit {
    id: u64,
    title: String,
    cover_xl: Option<String>,
    artist: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    title: String,
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Contributor {
    name: String,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumDetail {
    title: Option<String>,
    label: Option<String>,
    release_date: Option<String>,
    record_type: Option<String>,
    nb_tracks: Option<u32>,
    cover_xl: Option<String>,
    link: Option<String>,
    artist: Option<NamedRef>,
    genres: Option<DataList<NamedRef>>,
    tracks: Option<DataList<TrackItem>>,
    #[serde(default)]
    contributors: Vec<Contributor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_pictures_are_dropped() {
        assert_eq!(
            real_picture(Some("https://e-cdns-images.dzcdn.net/images/artist//1000x1000-000000-80-0-0.jpg".into())),
            None
        );
        assert_eq!(
            real_picture(Some("https://e-cdns-images.dzcdn.net/images/artist/abc/1000x1000.jpg".into())).as_deref(),
            Some("https://e-cdns-images.dzcdn.net/images/artist/abc/1000x1000.jpg")
        );
        assert_eq!(real_picture(None), None);
    }
}
