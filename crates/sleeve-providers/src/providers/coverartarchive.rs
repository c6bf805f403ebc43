// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::providers::MusicBrainzProvider;
use crate::rate_limiter::RequestQueues;
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sleeve_domain::{AlbumQuery, ImageData, ImageKind, SourceInfo, SourcedResult, Tier};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "coverartarchive";
pub const DEFAULT_BASE_URL: &str = "https://coverartarchive.org";

/// Largest pre-rendered thumbnail first; the original can be enormous.
const THUMBNAIL_PREFERENCE: [&str; 4] = ["1200", "large", "500", "250"];

/// Cover Art Archive. Keyed on release-group MBIDs, which are resolved through
/// MusicBrainz when the query does not carry one.
#[derive(Debug, Clone)]
pub struct CoverArtArchiveProvider {
    http: ProviderHttp,
    musicbrainz: Arc<MusicBrainzProvider>,
}

impl CoverArtArchiveProvider {
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

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    async fn fetch_cover(
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
        if self.http.cancelled(token, "cover lookup") {
            return Ok(None);
        }

        let url = self.http.url(&format!("/release-group/{mbid}"));
        debug!(target: "coverartarchive", url = %url, "fetching cover art listing");
        let listing: CoverArtListing = self.http.send(self.http.get(&url)).await?;

        let Some(image) = listing
            .images
            .iter()
            .find(|image| image.front)
            .or_else(|| listing.images.first())
        else {
            return Ok(None);
        };

        let url = THUMBNAIL_PREFERENCE
            .iter()
            .find_map(|size| image.thumbnails.get(*size))
            .unwrap_or(&image.image);

        Ok(Some(ImageData::new(url.clone(), ImageKind::Cover)))
    }
}

#[async_trait]
impl MetadataProvider for CoverArtArchiveProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Professional)
    }

    async fn album_cover(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let image = settle(NAME, "album_cover", self.fetch_cover(query, token).await)?;
        SourcedResult::new(image, self.source())
    }
}

#[derive(Debug, Deserialize)]
struct CoverArtListing {
    #[serde(default)]
    images: Vec<CoverArtImage>,
}

#[derive(Debug, Deserialize)]
struct CoverArtImage {
    image: String,
    #[serde(default)]
    front: bool,
    #[serde(default)]
    thumbnails: HashMap<String, String>,
}
