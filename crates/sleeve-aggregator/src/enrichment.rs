// SPDX-License-Identifier: GPL-3.0-or-later

//! Second-pass lookups that fill thin fields on an otherwise final result.
//!
//! Enrichment edits the payload only. The result stays attributed to the
//! provider that answered the main lookup.

use sleeve_config::EnrichmentConfig;
use sleeve_domain::{AlbumData, AlbumQuery, ArtistData, ArtistQuery, Ranked, SourcedResult};
use sleeve_providers::text::first_sentence;
use sleeve_providers::{BiographySource, SimilarArtistsSource, TextSummary};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Appended to an artist name when searching for its article, in order.
const ARTIST_SUFFIXES: [&str; 5] = ["", " (band)", " (musician)", " (singer)", " (rapper)"];

pub struct Enricher {
    biography: Option<Arc<dyn BiographySource>>,
    similar_artists: Option<Arc<dyn SimilarArtistsSource>>,
    min_text_length: usize,
}

impl Enricher {
    /// Sources switched off in `config` are dropped here.
    pub fn new(
        config: &EnrichmentConfig,
        biography: Option<Arc<dyn BiographySource>>,
        similar_artists: Option<Arc<dyn SimilarArtistsSource>>,
    ) -> Self {
        Self {
            biography: biography.filter(|_| config.biography),
            similar_artists: similar_artists.filter(|_| config.similar_artists),
            min_text_length: config.min_text_length,
        }
    }

    pub fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    /// Missing, blank or shorter than the configured minimum.
    pub fn is_thin(&self, text: Option<&str>) -> bool {
        text.map_or(true, |text| text.trim().chars().count() < self.min_text_length)
    }

    #[instrument(skip(self, result, token), fields(artist = %query.name))]
    pub async fn enrich_artist(
        &self,
        mut result: SourcedResult<ArtistData>,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> SourcedResult<ArtistData> {
        if self.is_thin(result.data().bio.as_deref()) {
            let reference = result.data().article_url.clone();
            let terms: Vec<String> = ARTIST_SUFFIXES
                .iter()
                .map(|suffix| format!("{}{suffix}", query.name))
                .collect();
            if let Some(text) = self.recover_text(reference.as_deref(), &terms, token).await {
                let (bio, summary) = split_summary(text);
                result.enrich(|artist| {
                    artist.bio = Some(bio);
                    artist.bio_summary = summary;
                });
            }
        }

        if result.data().similar_artists.is_empty() {
            if let Some(source) = self.similar_artists.as_ref() {
                if token.is_cancelled() {
                    debug!(target: "enrichment", "cancelled before similar-artist lookup");
                    return result;
                }
                // Only `similar_artists` is set on the secondary, so the merge
                // fills that field and leaves the rest of the primary alone.
                let secondary = source
                    .similar_artists(query, token)
                    .await
                    .and_then(|similar| {
                        SourcedResult::new(
                            ArtistData {
                                similar_artists: Ranked::from(similar),
                                ..ArtistData::default()
                            },
                            source.source(),
                        )
                    });
                if let Some(secondary) = secondary {
                    debug!(
                        target: "enrichment",
                        provider = %secondary.source().name,
                        count = secondary.data().similar_artists.len(),
                        "similar artists recovered"
                    );
                    result = result.merge_with(secondary);
                }
            }
        }

        result
    }

    #[instrument(skip(self, result, token), fields(artist = %query.artist, album = %query.title))]
    pub async fn enrich_album(
        &self,
        mut result: SourcedResult<AlbumData>,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> SourcedResult<AlbumData> {
        if !self.is_thin(result.data().description.as_deref()) {
            return result;
        }

        let reference = result.data().article_url.clone();
        let terms = vec![
            format!("{} (album)", query.title),
            format!("{} ({} album)", query.title, query.artist),
            query.title.clone(),
        ];
        if let Some(text) = self.recover_text(reference.as_deref(), &terms, token).await {
            let (description, summary) = split_summary(text);
            result.enrich(|album| {
                album.description = Some(description);
                album.description_summary = summary;
            });
        }
        result
    }

    /// Article text long enough to replace a thin one: first by reference,
    /// then by searching each term in turn.
    async fn recover_text(
        &self,
        reference: Option<&str>,
        terms: &[String],
        token: &CancellationToken,
    ) -> Option<TextSummary> {
        let source = self.biography.as_ref()?;

        if let Some(reference) = reference {
            if token.is_cancelled() {
                debug!(target: "enrichment", "cancelled before article lookup");
                return None;
            }
            match source.summary_by_reference(reference, token).await {
                Some(text) if !self.is_thin(Some(&text.text)) => {
                    debug!(target: "enrichment", reference, "text recovered from article reference");
                    return Some(text);
                }
                _ => debug!(target: "enrichment", reference, "article reference gave no usable text"),
            }
        }

        for term in terms {
            if token.is_cancelled() {
                debug!(target: "enrichment", "cancelled before article search");
                return None;
            }
            if let Some(text) = source.search_summary(term, token).await {
                if !self.is_thin(Some(&text.text)) {
                    debug!(target: "enrichment", term = %term, "text recovered from search");
                    return Some(text);
                }
            }
        }

        debug!(target: "enrichment", "no article text found");
        None
    }
}

fn split_summary(text: TextSummary) -> (String, Option<String>) {
    let summary = text.summary.or_else(|| Some(first_sentence(&text.text)));
    (text.text, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thin_text() {
        let enricher = Enricher::new(&EnrichmentConfig::default(), None, None);
        assert!(enricher.is_thin(None));
        assert!(enricher.is_thin(Some("   ")));
        assert!(enricher.is_thin(Some("A short blurb of forty characters or so.")));
        assert!(!enricher.is_thin(Some(&"x".repeat(100))));
    }

    #[test]
    fn test_disabled_sources_are_dropped() {
        let config = EnrichmentConfig {
            biography: false,
            similar_artists: false,
            ..EnrichmentConfig::default()
        };
        let enricher = Enricher::new(&config, None, None);
        assert!(enricher.biography.is_none());
        assert!(enricher.similar_artists.is_none());
        assert_eq!(enricher.min_text_length(), 100);
    }

    #[test]
    fn test_split_summary_falls_back_to_first_sentence() {
        let (text, summary) = split_summary(TextSummary {
            text: "One. Two.".to_string(),
            summary: None,
            url: None,
        });
        assert_eq!(text, "One. Two.");
        assert_eq!(summary.as_deref(), Some("One."));
    }
}
