// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared data model for the metadata aggregation engine.
//!
//! Every record field is optional: no provider guarantees completeness, and an
//! absent field means "unknown", never "empty".

pub mod merge;
pub mod rate_limit;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

pub use merge::{Appended, Merge, Ranked, TagList};
pub use rate_limit::{RateLimitConfig, RateLimitTable};

/// Descriptive client identifier sent to every provider unless configured.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "sleeve/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/sleeve-metadata/sleeve )"
);

// ============================================================================
// Attribution
// ============================================================================

/// Presumed trustworthiness of a provider. Call order is decided by the chain
/// a provider is placed in, not by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    Professional = 1,
    Commercial = 2,
    Community = 3,
    Specialized = 4,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Professional),
            2 => Ok(Self::Commercial),
            3 => Ok(Self::Community),
            4 => Ok(Self::Specialized),
            other => Err(format!("unknown provider tier {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub tier: Tier,
}

impl SourceInfo {
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            name: name.into(),
            tier,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tier {})", self.name, self.tier.as_u8())
    }
}

/// Implemented by payloads that can tell whether they carry anything useful.
pub trait HasData {
    fn has_data(&self) -> bool;
}

/// A payload together with the provider that produced it.
///
/// Cannot be built around an empty payload: a provider that found nothing
/// yields `None` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedResult<T> {
    data: T,
    source: SourceInfo,
    fetched_at: DateTime<Utc>,
}

impl<T: HasData> SourcedResult<T> {
    /// Wrap `data`, stamped with the current time. Returns `None` when the
    /// payload is empty.
    pub fn new(data: T, source: SourceInfo) -> Option<Self> {
        Self::fetched_at(data, source, Utc::now())
    }

    pub fn fetched_at(data: T, source: SourceInfo, fetched_at: DateTime<Utc>) -> Option<Self> {
        data.has_data().then_some(Self {
            data,
            source,
            fetched_at,
        })
    }

    /// Fill fields on the payload in place. Attribution is left untouched.
    pub fn enrich(&mut self, apply: impl FnOnce(&mut T)) {
        apply(&mut self.data);
    }
}

impl<T> SourcedResult<T> {
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T: Merge> SourcedResult<T> {
    /// Combine `secondary` into this result field by field. `source` and
    /// `fetched_at` always stay those of `self`.
    pub fn merge_with(self, secondary: SourcedResult<T>) -> Self {
        Self {
            data: self.data.merge(secondary.data),
            source: self.source,
            fetched_at: self.fetched_at,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub position: Option<String>,
    pub title: String,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarArtist {
    pub name: String,
    pub mbid: Option<String>,
    pub url: Option<String>,
}

impl SimilarArtist {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mbid: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Score on the provider's own scale (most use 0-10).
    pub value: f32,
    pub votes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistData {
    pub name: Option<String>,
    pub mbid: Option<String>,
    pub artist_type: Option<String>,
    pub country: Option<String>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub bio: Option<String>,
    pub bio_summary: Option<String>,
    pub tags: TagList,
    pub genres: TagList,
    pub similar_artists: Ranked<SimilarArtist>,
    pub members: Ranked<String>,
    pub links: Appended<Link>,
    pub image_url: Option<String>,
    pub listeners: Option<u64>,
    /// Cross-reference to the text-biography provider's article about this artist.
    pub article_url: Option<String>,
}

impl HasData for ArtistData {
    fn has_data(&self) -> bool {
        present(&self.artist_type)
            || present(&self.country)
            || present(&self.begin_date)
            || present(&self.end_date)
            || present(&self.bio)
            || present(&self.bio_summary)
            || !self.tags.is_empty()
            || !self.genres.is_empty()
            || !self.similar_artists.is_empty()
            || !self.members.is_empty()
            || !self.links.is_empty()
            || present(&self.image_url)
            || self.listeners.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumData {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub mbid: Option<String>,
    pub album_type: Option<String>,
    pub release_date: Option<String>,
    pub year: Option<i32>,
    pub label: Option<String>,
    pub country: Option<String>,
    pub track_count: Option<u32>,
    pub description: Option<String>,
    pub description_summary: Option<String>,
    pub tags: TagList,
    pub genres: TagList,
    pub tracks: Ranked<Track>,
    pub credits: Appended<Credit>,
    pub links: Appended<Link>,
    pub rating: Option<Rating>,
    pub cover_url: Option<String>,
    /// Cross-reference to the text-biography provider's article about this album.
    pub article_url: Option<String>,
}

impl HasData for AlbumData {
    fn has_data(&self) -> bool {
        present(&self.album_type)
            || present(&self.release_date)
            || self.year.is_some()
            || present(&self.label)
            || present(&self.country)
            || self.track_count.is_some()
            || present(&self.description)
            || present(&self.description_summary)
            || !self.tags.is_empty()
            || !self.genres.is_empty()
            || !self.tracks.is_empty()
            || !self.credits.is_empty()
            || !self.links.is_empty()
            || self.rating.is_some()
            || present(&self.cover_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Thumb,
    Fanart,
    Logo,
    Banner,
    Cover,
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub kind: ImageKind,
}

impl ImageData {
    pub fn new(url: impl Into<String>, kind: ImageKind) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            kind,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

impl HasData for ImageData {
    fn has_data(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}

// ============================================================================
// Queries & cache keys
// ============================================================================

/// Separates the artist and title halves of a composite key. Not expected to
/// appear in either field.
pub const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistQuery {
    pub name: String,
    pub mbid: Option<String>,
}

impl ArtistQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mbid: None,
        }
    }

    pub fn with_mbid(mut self, mbid: impl Into<String>) -> Self {
        self.mbid = Some(mbid.into());
        self
    }

    pub fn cache_key(&self) -> String {
        normalize_key(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlbumQuery {
    pub title: String,
    pub artist: String,
    pub mbid: Option<String>,
}

impl AlbumQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            mbid: None,
        }
    }

    pub fn with_mbid(mut self, mbid: impl Into<String>) -> Self {
        self.mbid = Some(mbid.into());
        self
    }

    pub fn artist_query(&self) -> ArtistQuery {
        ArtistQuery::new(self.artist.clone())
    }

    pub fn cache_key(&self) -> String {
        format!(
            "{}{}{}",
            normalize_key(&self.artist),
            KEY_SEPARATOR,
            normalize_key(&self.title)
        )
    }
}

/// Canonical form of a free-text query: NFC, lower-case, trimmed, with runs of
/// whitespace collapsed to a single space.
pub fn normalize_key(value: &str) -> String {
    let composed: String = value.nfc().collect();
    composed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
