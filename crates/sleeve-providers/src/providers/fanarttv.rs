// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{ProviderError, Result};
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::providers::MusicBrainzProvider;
use crate::rate_limiter::RequestQueues;
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sleeve_domain::{
    AlbumQuery, ArtistQuery, ImageData, ImageKind, SourceInfo, SourcedResult, Tier,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "fanarttv";
pub const DEFAULT_BASE_URL: &str = "https://webservice.fanart.tv/v3";

/// fanart.tv artwork, keyed on MusicBrainz ids.
#[derive(Debug, Clone)]
pub struct FanartTvProvider {
    http: ProviderHttp,
    musicbrainz: Arc<MusicBrainzProvider>,
}

impl FanartTvProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(
        client: Client,
        queues: RequestQueues,
        settings: ProviderSettings,
        musicbrainz: Arc<MusicBrainzProvider>,
    ) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
            musicbrainz,
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let api_key = self
            .http
            .api_key()
            .ok_or(ProviderError::MissingField("api_key"))?;
        let url = self.http.url(path);
        debug!(target: "fanarttv", url = %url, "fetching artwork");
        let request = self.http.get(&url).header("api-key", api_key);
        self.http.send_json(request).await
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn fetch_artist_artwork(
        &self,
        query: &ArtistQuery,
        fields: &[(&str, ImageKind)],
        token: &CancellationToken,
    ) -> Result<Option<ImageData>> {
        let Some(mbid) = self.musicbrainz.resolve_artist_mbid(query, token).await? else {
            return Ok(None);
        };
        if self.http.cancelled(token, "artist artwork") {
            return Ok(None);
        }

        let artwork = self.get(&format!("/music/{mbid}")).await?;
        for (field, kind) in fields {
            if let Some(url) = most_liked(parse_images(artwork.get(*field))?) {
                return Ok(Some(ImageData::new(url, *kind)));
            }
        }
        Ok(None)
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    async fn fetch_album_cover(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<ImageData>> {
        let Some(mbid) = self
            .musicbrainz
            .resolve_release_group_mbid(query, token)
            .await?
        else {
            return Ok(None);
        };
        if self.http.cancelled(token, "album artwork") {
            return Ok(None);
        }

        let artwork = self.get(&format!("/music/albums/{mbid}")).await?;
        // Covers are nested per release group: {"albums": {"<mbid>": {"albumcover": [..]}}}.
        let mut covers = Vec::new();
        if let Some(albums) = artwork.get("albums").and_then(Value::as_object) {
            let ordered = albums
                .get(&mbid)
                .into_iter()
                .chain(albums.iter().filter(|(key, _)| **key != mbid).map(|(_, album)| album));
            for album in ordered {
                covers.extend(parse_images(album.get("albumcover"))?);
            }
        }

        Ok(most_liked(covers).map(|url| ImageData::new(url, ImageKind::Cover)))
    }
}

#[async_trait]
impl MetadataProvider for FanartTvProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Specialized)
    }

    async fn artist_image(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let fields = [
            ("artistthumb", ImageKind::Thumb),
            ("hdmusiclogo", ImageKind::Logo),
        ];
        let image = settle(
            NAME,
            "artist_image",
            self.fetch_artist_artwork(query, &fields, token).await,
        )?;
        SourcedResult::new(image, self.source())
    }

    async fn artist_background(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let fields = [
            ("artistbackground", ImageKind::Fanart),
            ("musicbanner", ImageKind::Banner),
        ];
        let image = settle(
            NAME,
            "artist_background",
            self.fetch_artist_artwork(query, &fields, token).await,
        )?;
        SourcedResult::new(image, self.source())
    }

    async fn album_cover(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let image = settle(NAME, "album_cover", self.fetch_album_cover(query, token).await)?;
        SourcedResult::new(image, self.source())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtworkImage {
    url: String,
    likes: u32,
}

#[derive(Debug, Deserialize)]
struct ArtworkItem {
    url: String,
    likes: Option<String>,
}

fn parse_images(raw: Option<&Value>) -> Result<Vec<ArtworkImage>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let items: Vec<ArtworkItem> = serde_json::from_value(raw.clone())?;
    Ok(items
        .into_iter()
        .map(|item| ArtworkImage {
            url: item.url,
            likes: item
                .likes
                .and_then(|likes| likes.parse::<u32>().ok())
                .unwrap_or(0),
        })
        .collect())
}

/// URL of the most liked image; the first listed wins a tie.
fn most_liked(images: Vec<ArtworkImage>) -> Option<String> {
    images
        .into_iter()
        .filter(|image| !image.url.trim().is_empty())
        .reduce(|best, image| if image.likes > best.likes { image } else { best })
        .map(|image| image.url)
}
