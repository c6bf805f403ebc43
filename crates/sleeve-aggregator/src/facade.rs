// SPDX-License-Identifier: GPL-3.0-or-later

//! Public entry point: cache lookup, provider fallback, enrichment and cache
//! write for each kind of metadata.

use crate::cache::{CacheTtls, MetadataCache, TtlCache};
use crate::enrichment::Enricher;
use crate::fallback::FallbackChain;
use crate::roster::build_roster;
use anyhow::Result;
use futures::future::BoxFuture;
use sleeve_config::{AppConfig, EnrichmentConfig};
use sleeve_domain::{
    AlbumData, AlbumQuery, ArtistData, ArtistQuery, HasData, ImageData, SourcedResult,
};
use sleeve_providers::{BiographySource, MetadataProvider, SimilarArtistsSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Ordered providers for each lookup kind. Earlier entries are asked first.
#[derive(Clone, Default)]
pub struct ProviderChains {
    pub artist_info: Vec<Arc<dyn MetadataProvider>>,
    pub album_info: Vec<Arc<dyn MetadataProvider>>,
    pub artist_image: Vec<Arc<dyn MetadataProvider>>,
    pub artist_background: Vec<Arc<dyn MetadataProvider>>,
    pub album_cover: Vec<Arc<dyn MetadataProvider>>,
}

pub struct Aggregator {
    chains: ProviderChains,
    enricher: Enricher,
    cache: Arc<MetadataCache>,
}

#[derive(Default)]
pub struct AggregatorBuilder {
    chains: ProviderChains,
    biography: Option<Arc<dyn BiographySource>>,
    similar_artists: Option<Arc<dyn SimilarArtistsSource>>,
    cache: Option<Arc<MetadataCache>>,
    cache_ttls: CacheTtls,
    enrichment: EnrichmentConfig,
}

impl AggregatorBuilder {
    pub fn chains(mut self, chains: ProviderChains) -> Self {
        self.chains = chains;
        self
    }

    pub fn biography_source(mut self, source: Arc<dyn BiographySource>) -> Self {
        self.biography = Some(source);
        self
    }

    pub fn similar_artists_source(mut self, source: Arc<dyn SimilarArtistsSource>) -> Self {
        self.similar_artists = Some(source);
        self
    }

    /// Share an existing cache. Without one a fresh cache is created with
    /// the configured TTLs.
    pub fn cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_ttls(mut self, ttls: CacheTtls) -> Self {
        self.cache_ttls = ttls;
        self
    }

    pub fn enrichment(mut self, config: EnrichmentConfig) -> Self {
        self.enrichment = config;
        self
    }

    pub fn build(self) -> Aggregator {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MetadataCache::new(self.cache_ttls)));
        Aggregator {
            chains: self.chains,
            enricher: Enricher::new(&self.enrichment, self.biography, self.similar_artists),
            cache,
        }
    }
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::default()
    }

    /// Aggregator over the default provider roster.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let roster = build_roster(config)?;
        let mut builder = Self::builder()
            .chains(roster.chains)
            .cache_ttls(CacheTtls {
                info: config.cache.info_ttl(),
                image: config.cache.image_ttl(),
            })
            .enrichment(config.enrichment.clone());
        if let Some(source) = roster.biography {
            builder = builder.biography_source(source);
        }
        if let Some(source) = roster.similar_artists {
            builder = builder.similar_artists_source(source);
        }
        Ok(builder.build())
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    pub async fn fetch_artist_info(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.artist_info.get(&key) {
            debug!(target: "aggregator", key = %key, "artist info served from cache");
            return Some(hit);
        }

        let result = provider_chain("artist_info", &self.chains.artist_info, move |provider| {
            provider.artist_info(query, token)
        })
        .run(token)
        .await?;

        if token.is_cancelled() {
            debug!(target: "aggregator", "cancelled, enrichment and caching skipped");
            return Some(result);
        }
        let result = self.enricher.enrich_artist(result, query, token).await;
        self.store_info(&self.cache.artist_info, key, &result, token);
        Some(result)
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    pub async fn fetch_album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.album_info.get(&key) {
            debug!(target: "aggregator", "album info served from cache");
            return Some(hit);
        }

        let result = provider_chain("album_info", &self.chains.album_info, move |provider| {
            provider.album_info(query, token)
        })
        .run(token)
        .await?;

        if token.is_cancelled() {
            debug!(target: "aggregator", "cancelled, enrichment and caching skipped");
            return Some(result);
        }
        let result = self.enricher.enrich_album(result, query, token).await;
        self.store_info(&self.cache.album_info, key, &result, token);
        Some(result)
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    pub async fn fetch_artist_image(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.artist_image.get(&key) {
            return Some(hit);
        }

        let result = provider_chain("artist_image", &self.chains.artist_image, move |provider| {
            provider.artist_image(query, token)
        })
        .run(token)
        .await?;
        self.cache.artist_image.insert(key, result.clone());
        Some(result)
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    pub async fn fetch_artist_background(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.artist_background.get(&key) {
            return Some(hit);
        }

        let result = provider_chain(
            "artist_background",
            &self.chains.artist_background,
            move |provider| provider.artist_background(query, token),
        )
        .run(token)
        .await?;
        self.cache.artist_background.insert(key, result.clone());
        Some(result)
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    pub async fn fetch_album_cover(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.album_cover.get(&key) {
            return Some(hit);
        }

        let result = provider_chain("album_cover", &self.chains.album_cover, move |provider| {
            provider.album_cover(query, token)
        })
        .run(token)
        .await?;
        self.cache.album_cover.insert(key, result.clone());
        Some(result)
    }

    pub fn clear_all_caches(&self) -> usize {
        self.cache.clear_all()
    }

    pub fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired()
    }

    /// Info results are only cached when enrichment ran to completion.
    fn store_info<T>(
        &self,
        cache: &TtlCache<T>,
        key: String,
        result: &SourcedResult<T>,
        token: &CancellationToken,
    ) where
        T: Clone,
    {
        if token.is_cancelled() {
            debug!(target: "aggregator", cache = cache.name(), "cancelled during enrichment, result not cached");
            return;
        }
        cache.insert(key, result.clone());
    }
}

/// One attempt per provider, each calling `call` on it.
fn provider_chain<'a, T, F>(
    label: &'static str,
    providers: &'a [Arc<dyn MetadataProvider>],
    call: F,
) -> FallbackChain<'a, T>
where
    T: HasData + Send + 'a,
    F: Fn(&'a dyn MetadataProvider) -> BoxFuture<'a, Option<SourcedResult<T>>>
        + Copy
        + Send
        + 'a,
{
    providers
        .iter()
        .fold(FallbackChain::new(label), |chain, provider| {
            let provider: &'a dyn MetadataProvider = provider.as_ref();
            chain.attempt(provider.source().name, move || async move {
                anyhow::Ok(call(provider).await)
            })
        })
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("artist_info", &self.chains.artist_info.len())
            .field("album_info", &self.chains.album_info.len())
            .field("artist_image", &self.chains.artist_image.len())
            .field("artist_background", &self.chains.artist_background.len())
            .field("album_cover", &self.chains.album_cover.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_chains_return_none() {
        let aggregator = Aggregator::builder().build();
        let token = CancellationToken::new();

        assert!(aggregator
            .fetch_artist_info(&ArtistQuery::new("Radiohead"), &token)
            .await
            .is_none());
        assert!(aggregator
            .fetch_album_cover(&AlbumQuery::new("Radiohead", "OK Computer"), &token)
            .await
            .is_none());
        assert!(aggregator.cache().is_empty());
    }

    #[test]
    fn test_from_config_builds() {
        let aggregator = Aggregator::from_config(&AppConfig::default()).unwrap();
        assert!(!aggregator.chains.artist_info.is_empty());
        assert_eq!(aggregator.clear_all_caches(), 0);
    }
}
