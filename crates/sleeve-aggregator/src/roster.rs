// SPDX-License-Identifier: GPL-3.0-or-later

//! Builds the default provider chains from configuration.

use crate::facade::ProviderChains;
use anyhow::{Context, Result};
use reqwest::Client;
use sleeve_config::{AppConfig, ProviderConfig};
use sleeve_providers::{
    BiographySource, CoverArtArchiveProvider, DeezerProvider, DiscogsProvider, FanartTvProvider,
    GeniusProvider, ITunesProvider, LastFmProvider, MetadataProvider, MusicBrainzProvider,
    ProviderSettings, RequestQueues, SimilarArtistsSource, TheAudioDbProvider, WikipediaProvider,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything `build_roster` wires up. The queues are kept so callers can
/// inspect or share them.
pub struct Roster {
    pub chains: ProviderChains,
    pub biography: Option<Arc<dyn BiographySource>>,
    pub similar_artists: Option<Arc<dyn SimilarArtistsSource>>,
    pub queues: RequestQueues,
}

/// Instantiate every enabled provider and arrange them into the default
/// chains. Providers that need a key and have none are left out.
pub fn build_roster(config: &AppConfig) -> Result<Roster> {
    // The User-Agent is set per request from each provider's settings.
    let client = Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let queues = RequestQueues::new(config.rate_limits.clone());
    let providers = &config.providers;

    let settings = |defaults: ProviderSettings, provider: &ProviderConfig| {
        defaults
            .base_url_override(provider.base_url.as_deref())
            .api_key(provider.api_key())
            .timeout(provider.timeout(&config.http))
            .user_agent(config.http.user_agent.clone())
    };

    // MusicBrainz also resolves MBIDs for the artwork providers, so it is built
    // even when it does not take part in the info chains.
    let musicbrainz = Arc::new(MusicBrainzProvider::new(
        client.clone(),
        queues.clone(),
        settings(MusicBrainzProvider::default_settings(), &providers.musicbrainz),
    ));

    let discogs = enabled(DiscogsProvider::NAME, &providers.discogs, false).then(|| {
        Arc::new(DiscogsProvider::new(
            client.clone(),
            queues.clone(),
            settings(DiscogsProvider::default_settings(), &providers.discogs),
        ))
    });
    let wikipedia = enabled(WikipediaProvider::NAME, &providers.wikipedia, false).then(|| {
        Arc::new(WikipediaProvider::new(
            client.clone(),
            queues.clone(),
            settings(WikipediaProvider::default_settings(), &providers.wikipedia),
        ))
    });
    let coverartarchive =
        enabled(CoverArtArchiveProvider::NAME, &providers.coverartarchive, false).then(|| {
            Arc::new(CoverArtArchiveProvider::new(
                client.clone(),
                queues.clone(),
                settings(CoverArtArchiveProvider::default_settings(), &providers.coverartarchive),
                Arc::clone(&musicbrainz),
            ))
        });
    let itunes = enabled(ITunesProvider::NAME, &providers.itunes, false).then(|| {
        Arc::new(ITunesProvider::new(
            client.clone(),
            queues.clone(),
            settings(ITunesProvider::default_settings(), &providers.itunes),
        ))
    });
    let lastfm = enabled(LastFmProvider::NAME, &providers.lastfm, true).then(|| {
        Arc::new(LastFmProvider::new(
            client.clone(),
            queues.clone(),
            settings(LastFmProvider::default_settings(), &providers.lastfm),
        ))
    });
    let theaudiodb = enabled(TheAudioDbProvider::NAME, &providers.theaudiodb, true).then(|| {
        Arc::new(TheAudioDbProvider::new(
            client.clone(),
            queues.clone(),
            settings(TheAudioDbProvider::default_settings(), &providers.theaudiodb),
        ))
    });
    let deezer = enabled(DeezerProvider::NAME, &providers.deezer, false).then(|| {
        Arc::new(DeezerProvider::new(
            client.clone(),
            queues.clone(),
            settings(DeezerProvider::default_settings(), &providers.deezer),
        ))
    });
    let genius = enabled(GeniusProvider::NAME, &providers.genius, true).then(|| {
        Arc::new(GeniusProvider::new(
            client.clone(),
            queues.clone(),
            settings(GeniusProvider::default_settings(), &providers.genius),
        ))
    });
    let fanarttv = enabled(FanartTvProvider::NAME, &providers.fanarttv, true).then(|| {
        Arc::new(FanartTvProvider::new(
            client.clone(),
            queues.clone(),
            settings(FanartTvProvider::default_settings(), &providers.fanarttv),
            Arc::clone(&musicbrainz),
        ))
    });
    let musicbrainz_chain = enabled(MusicBrainzProvider::NAME, &providers.musicbrainz, false)
        .then(|| Arc::clone(&musicbrainz));

    let chains = ProviderChains {
        artist_info: chain([
            as_provider(&musicbrainz_chain),
            as_provider(&discogs),
            as_provider(&lastfm),
            as_provider(&theaudiodb),
            as_provider(&genius),
        ]),
        album_info: chain([
            as_provider(&musicbrainz_chain),
            as_provider(&discogs),
            as_provider(&itunes),
            as_provider(&lastfm),
            as_provider(&theaudiodb),
            as_provider(&deezer),
        ]),
        artist_image: chain([
            as_provider(&theaudiodb),
            as_provider(&deezer),
            as_provider(&fanarttv),
        ]),
        artist_background: chain([as_provider(&theaudiodb), as_provider(&fanarttv)]),
        album_cover: chain([
            as_provider(&coverartarchive),
            as_provider(&itunes),
            as_provider(&deezer),
            as_provider(&theaudiodb),
            as_provider(&fanarttv),
        ]),
    };

    let biography = if config.enrichment.biography {
        wikipedia.map(|provider| provider as Arc<dyn BiographySource>)
    } else {
        None
    };
    let similar_artists = if config.enrichment.similar_artists {
        lastfm.map(|provider| provider as Arc<dyn SimilarArtistsSource>)
    } else {
        None
    };

    info!(
        target: "aggregator",
        artist_info = chains.artist_info.len(),
        album_info = chains.album_info.len(),
        artist_image = chains.artist_image.len(),
        artist_background = chains.artist_background.len(),
        album_cover = chains.album_cover.len(),
        biography = biography.is_some(),
        similar_artists = similar_artists.is_some(),
        "provider roster built"
    );

    Ok(Roster {
        chains,
        biography,
        similar_artists,
        queues,
    })
}

fn enabled(name: &str, provider: &ProviderConfig, needs_key: bool) -> bool {
    if !provider.enabled {
        debug!(target: "aggregator", provider = name, "provider disabled");
        return false;
    }
    if needs_key && provider.api_key().is_none() {
        warn!(target: "aggregator", provider = name, "no API key configured, provider skipped");
        return false;
    }
    true
}

fn as_provider<P>(provider: &Option<Arc<P>>) -> Option<Arc<dyn MetadataProvider>>
where
    P: MetadataProvider + 'static,
{
    provider
        .as_ref()
        .map(|provider| Arc::clone(provider) as Arc<dyn MetadataProvider>)
}

fn chain<const N: usize>(
    providers: [Option<Arc<dyn MetadataProvider>>; N],
) -> Vec<Arc<dyn MetadataProvider>> {
    providers.into_iter().flatten().collect()
}
