// SPDX-License-Identifier: GPL-3.0-or-later

//! Adapters for the external metadata services, plus the request queues and
//! HTTP plumbing they share.
//!
//! An adapter never fails past its own boundary: network errors, error
//! statuses, API error payloads and unparseable bodies are logged and turned
//! into `None`.

pub mod error;
pub mod http;
pub mod matching;
pub mod providers;
pub mod rate_limiter;
pub mod text;

use async_trait::async_trait;
use sleeve_domain::{
    AlbumData, AlbumQuery, ArtistData, ArtistQuery, ImageData, SimilarArtist, SourceInfo,
    SourcedResult,
};
use tokio_util::sync::CancellationToken;

pub use error::{ProviderError, Result};
pub use http::{ProviderHttp, ProviderSettings, DEFAULT_USER_AGENT};
pub use providers::{
    CoverArtArchiveProvider, DeezerProvider, DiscogsProvider, FanartTvProvider, GeniusProvider,
    ITunesProvider, LastFmProvider, MusicBrainzProvider, TheAudioDbProvider, WikipediaProvider,
};
pub use rate_limiter::{QueueError, RequestQueues};

/// One external data source. Implementors override the lookups they support;
/// the rest report "nothing found".
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn source(&self) -> SourceInfo;

    async fn artist_info(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        None
    }

    async fn album_info(
        &self,
        _query: &AlbumQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        None
    }

    async fn artist_image(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        None
    }

    async fn artist_background(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        None
    }

    async fn album_cover(
        &self,
        _query: &AlbumQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        None
    }
}

/// Long-form text about an artist or album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSummary {
    pub text: String,
    pub summary: Option<String>,
    /// Canonical page the text was taken from.
    pub url: Option<String>,
}

/// Provider of encyclopedic text, used to fill thin biographies.
#[async_trait]
pub trait BiographySource: Send + Sync {
    fn source(&self) -> SourceInfo;

    /// Fetch the article a previous lookup pointed at.
    async fn summary_by_reference(
        &self,
        reference: &str,
        token: &CancellationToken,
    ) -> Option<TextSummary>;

    /// Search by free text and return the best article.
    async fn search_summary(&self, term: &str, token: &CancellationToken) -> Option<TextSummary>;
}

#[async_trait]
pub trait SimilarArtistsSource: Send + Sync {
    fn source(&self) -> SourceInfo;

    async fn similar_artists(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<Vec<SimilarArtist>>;
}
