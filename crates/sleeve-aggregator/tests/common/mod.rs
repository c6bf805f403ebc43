// SPDX-License-Identifier: GPL-3.0-or-later
#![allow(dead_code)]

use async_trait::async_trait;
use sleeve_domain::{
    AlbumData, AlbumQuery, ArtistData, ArtistQuery, ImageData, SimilarArtist, SourceInfo,
    SourcedResult, Tier,
};
use sleeve_providers::{BiographySource, MetadataProvider, SimilarArtistsSource, TextSummary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Provider returning canned payloads and counting every call it receives.
#[derive(Default)]
pub struct StubProvider {
    name: &'static str,
    artist: Option<ArtistData>,
    album: Option<AlbumData>,
    image: Option<ImageData>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn with_artist(mut self, artist: ArtistData) -> Self {
        self.artist = Some(artist);
        self
    }

    pub fn with_album(mut self, album: AlbumData) -> Self {
        self.album = Some(album);
        self
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: sleeve_domain::HasData + Clone>(&self, data: &Option<T>) -> Option<SourcedResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        data.clone()
            .and_then(|data| SourcedResult::new(data, self.source()))
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(self.name, Tier::Community)
    }

    async fn artist_info(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        self.answer(&self.artist)
    }

    async fn album_info(
        &self,
        _query: &AlbumQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        self.answer(&self.album)
    }

    async fn artist_image(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        self.answer(&self.image)
    }

    async fn artist_background(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        self.answer(&self.image)
    }

    async fn album_cover(
        &self,
        _query: &AlbumQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        self.answer(&self.image)
    }
}

/// Answers every artist lookup with the queried name, after a delay that
/// shrinks for later letters so completions arrive out of order.
pub struct EchoProvider;

#[async_trait]
impl MetadataProvider for EchoProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new("echo", Tier::Community)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let first = query.name.bytes().next().unwrap_or(b'a');
        let delay = u64::from(b'z'.saturating_sub(first)) * 2;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        SourcedResult::new(
            ArtistData {
                name: Some(query.name.clone()),
                country: Some("GB".to_string()),
                ..ArtistData::default()
            },
            self.source(),
        )
    }
}

/// Holds every artist lookup open briefly and records the highest number of
/// lookups it saw in flight at once.
#[derive(Default)]
pub struct GateProvider {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GateProvider {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for GateProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new("gate", Tier::Community)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        SourcedResult::new(
            ArtistData {
                name: Some(query.name.clone()),
                country: Some("GB".to_string()),
                ..ArtistData::default()
            },
            self.source(),
        )
    }
}

/// Article lookups keyed by reference and by search term; records every
/// request in the order received.
#[derive(Default)]
pub struct StubBiography {
    by_reference: HashMap<String, TextSummary>,
    by_search: HashMap<String, TextSummary>,
    requests: Mutex<Vec<String>>,
}

impl StubBiography {
    pub fn with_reference(mut self, reference: &str, text: &str) -> Self {
        self.by_reference.insert(reference.to_string(), summary(text));
        self
    }

    pub fn with_search(mut self, term: &str, text: &str) -> Self {
        self.by_search.insert(term.to_string(), summary(text));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn summary(text: &str) -> TextSummary {
    TextSummary {
        text: text.to_string(),
        summary: None,
        url: None,
    }
}

#[async_trait]
impl BiographySource for StubBiography {
    fn source(&self) -> SourceInfo {
        SourceInfo::new("wikipedia", Tier::Professional)
    }

    async fn summary_by_reference(
        &self,
        reference: &str,
        _token: &CancellationToken,
    ) -> Option<TextSummary> {
        self.requests.lock().unwrap().push(format!("ref:{reference}"));
        self.by_reference.get(reference).cloned()
    }

    async fn search_summary(&self, term: &str, _token: &CancellationToken) -> Option<TextSummary> {
        self.requests.lock().unwrap().push(format!("search:{term}"));
        self.by_search.get(term).cloned()
    }
}

pub struct StubSimilar {
    names: Vec<&'static str>,
    calls: AtomicUsize,
}

impl StubSimilar {
    pub fn new(names: Vec<&'static str>) -> Self {
        Self {
            names,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilarArtistsSource for StubSimilar {
    fn source(&self) -> SourceInfo {
        SourceInfo::new("lastfm", Tier::Community)
    }

    async fn similar_artists(
        &self,
        _query: &ArtistQuery,
        _token: &CancellationToken,
    ) -> Option<Vec<SimilarArtist>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.names.is_empty() {
            return None;
        }
        Some(self.names.iter().map(|name| SimilarArtist::named(*name)).collect())
    }
}

pub fn as_chain(providers: &[&Arc<StubProvider>]) -> Vec<Arc<dyn MetadataProvider>> {
    providers
        .iter()
        .map(|provider| {
            let provider: Arc<dyn MetadataProvider> = Arc::<StubProvider>::clone(provider);
            provider
        })
        .collect()
}

pub fn long_text(subject: &str) -> String {
    format!(
        "{subject} is described here at length. This text runs well past the minimum length \
         that counts as a thin biography, so it is accepted as is."
    )
}
