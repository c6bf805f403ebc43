// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{ProviderError, Result};
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::matching::{best_match, match_score};
use crate::rate_limiter::RequestQueues;
use crate::text::{first_sentence, non_blank};
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use sleeve_domain::{Appended, ArtistData, ArtistQuery, Link, SourceInfo, SourcedResult, Tier};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "genius";
pub const DEFAULT_BASE_URL: &str = "https://api.genius.com";

/// Genius API. Only artist descriptions are used; songs are searched to find
/// the artist id.
#[derive(Debug, Clone)]
pub struct GeniusProvider {
    http: ProviderHttp,
}

impl GeniusProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    fn request(&self, url: &str) -> Result<RequestBuilder> {
        let token = self
            .http
            .api_key()
            .ok_or(ProviderError::MissingField("api_key"))?;
        Ok(self.http.get(url).bearer_auth(token))
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn fetch_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<ArtistData>> {
        let search_url = self.http.url("/search");
        let request = self.request(&search_url)?.query(&[("q", query.name.as_str())]);
        let search: Envelope<SearchPayload> = self.http.send(request).await?;

        let candidates: Vec<ArtistRef> = search
            .response
            .hits
            .into_iter()
            .filter_map(|hit| hit.result.primary_artist)
            .collect();
        let Some(artist) = best_match(candidates, |artist| match_score(&artist.name, &query.name))
        else {
            return Ok(None);
        };
        if self.http.cancelled(token, "artist detail") {
            return Ok(None);
        }

        let url = self.http.url(&format!("/artists/{}", artist.id));
        debug!(target: "genius", url = %url, "fetching artist detail");
        let request = self.request(&url)?.query(&[("text_format", "plain")]);
        let detail: Envelope<ArtistPayload> = self.http.send(request).await?;
        let detail = detail.response.artist;

        // Genius answers "?" for artists without a description.
        let bio = detail
            .description
            .and_then(|description| non_blank(description.plain))
            .filter(|text| text != "?");
        let mut links = Appended::default();
        if let Some(url) = non_blank(detail.url) {
            links.push(Link::new(NAME, url));
        }
        if let Some(handle) = non_blank(detail.twitter_name) {
            links.push(Link::new("twitter", format!("https://twitter.com/{handle}")));
        }
        if let Some(handle) = non_blank(detail.instagram_name) {
            links.push(Link::new("instagram", format!("https://instagram.com/{handle}")));
        }

        Ok(Some(ArtistData {
            name: Some(detail.name),
            bio_summary: bio.as_deref().map(first_sentence),
            bio,
            links,
            image_url: non_blank(detail.image_url).filter(|url| !url.contains("default_avatar")),
            ..ArtistData::default()
        }))
    }
}

#[async_trait]
impl MetadataProvider for GeniusProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Community)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let data = settle(NAME, "artist_info", self.fetch_artist(query, token).await)?;
        SourcedResult::new(data, self.source())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    primary_artist: Option<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistPayload {
    artist: ArtistDetail,
}

#[derive(Debug, Deserialize)]
struct Description {
    plain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistDetail {
    name: String,
    url: Option<String>,
    image_url: Option<String>,
    description: Option<Description>,
    twitter_name: Option<String>,
    instagram_name: Option<String>,
}
