// SPDX-License-Identifier: GPL-3.0-or-later

//! Field-level merge policies.
//!
//! The policy of a record field is decided by its type:
//!
//! | type          | policy                                                  |
//! |---------------|---------------------------------------------------------|
//! | `Option<T>`   | overlay: primary value when present, else secondary     |
//! | [`TagList`]   | union with duplicates removed                           |
//! | [`Appended`]  | concatenation, primary entries first, no dedup          |
//! | [`Ranked`]    | primary list when non-empty, else the secondary list    |
//!
//! Record impls destructure both sides without `..`, so a field added to a
//! record does not compile until it is merged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Deref;

use crate::{AlbumData, ArtistData, ImageData};

pub trait Merge {
    /// Combine `self` (primary) with `secondary`.
    fn merge(self, secondary: Self) -> Self;
}

impl<T> Merge for Option<T> {
    fn merge(self, secondary: Self) -> Self {
        self.or(secondary)
    }
}

/// Unordered labels such as tags and genres.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag unless a case-insensitive duplicate is already present.
    pub fn push(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return;
        }
        let folded = trimmed.to_lowercase();
        if !self.0.iter().any(|existing| existing.to_lowercase() == folded) {
            self.0.push(trimmed.to_string());
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        let folded = tag.trim().to_lowercase();
        self.0.iter().any(|existing| existing.to_lowercase() == folded)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Merge for TagList {
    fn merge(mut self, secondary: Self) -> Self {
        let mut seen: HashSet<String> = self.0.iter().map(|tag| tag.to_lowercase()).collect();
        for tag in secondary.0 {
            if seen.insert(tag.to_lowercase()) {
                self.0.push(tag);
            }
        }
        self
    }
}

impl<S: Into<String>> FromIterator<S> for TagList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.push(tag);
        }
        tags
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl Deref for TagList {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Collections where the same entry may legitimately come from two sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Appended<T>(Vec<T>);

impl<T> Appended<T> {
    pub fn push(&mut self, item: T) {
        self.0.push(item);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for Appended<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Merge for Appended<T> {
    fn merge(mut self, secondary: Self) -> Self {
        self.0.extend(secondary.0);
        self
    }
}

impl<T> FromIterator<T> for Appended<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> From<Vec<T>> for Appended<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for Appended<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Lists whose order or membership is only meaningful as a whole
/// (similar artists, band members, tracklists). Never interleaved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranked<T>(Vec<T>);

impl<T> Ranked<T> {
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for Ranked<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Merge for Ranked<T> {
    fn merge(self, secondary: Self) -> Self {
        if self.0.is_empty() {
            secondary
        } else {
            self
        }
    }
}

impl<T> FromIterator<T> for Ranked<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> From<Vec<T>> for Ranked<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for Ranked<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Merge for ArtistData {
    fn merge(self, secondary: Self) -> Self {
        let ArtistData {
            name,
            mbid,
            artist_type,
            country,
            begin_date,
            end_date,
            bio,
            bio_summary,
            tags,
            genres,
            similar_artists,
            members,
            links,
            image_url,
            listeners,
            article_url,
        } = self;
        let ArtistData {
            name: name_2,
            mbid: mbid_2,
            artist_type: artist_type_2,
            country: country_2,
            begin_date: begin_date_2,
            end_date: end_date_2,
            bio: bio_2,
            bio_summary: bio_summary_2,
            tags: tags_2,
            genres: genres_2,
            similar_artists: similar_artists_2,
            members: members_2,
            links: links_2,
            image_url: image_url_2,
            listeners: listeners_2,
            article_url: article_url_2,
        } = secondary;

        ArtistData {
            name: name.merge(name_2),
            mbid: mbid.merge(mbid_2),
            artist_type: artist_type.merge(artist_type_2),
            country: country.merge(country_2),
            begin_date: begin_date.merge(begin_date_2),
            end_date: end_date.merge(end_date_2),
            bio: bio.merge(bio_2),
            bio_summary: bio_summary.merge(bio_summary_2),
            tags: tags.merge(tags_2),
            genres: genres.merge(genres_2),
            similar_artists: similar_artists.merge(similar_artists_2),
            members: members.merge(members_2),
            links: links.merge(links_2),
            image_url: image_url.merge(image_url_2),
            listeners: listeners.merge(listeners_2),
            article_url: article_url.merge(article_url_2),
        }
    }
}

impl Merge for AlbumData {
    fn merge(self, secondary: Self) -> Self {
        let AlbumData {
            title,
            artist,
            mbid,
            album_type,
            release_date,
            year,
            label,
            country,
            track_count,
            description,
            description_summary,
            tags,
            genres,
            tracks,
            credits,
            links,
            rating,
            cover_url,
            article_url,
        } = self;
        let AlbumData {
            title: title_2,
            artist: artist_2,
            mbid: mbid_2,
            album_type: album_type_2,
            release_date: release_date_2,
            year: year_2,
            label: label_2,
            country: country_2,
            track_count: track_count_2,
            description: description_2,
            description_summary: description_summary_2,
            tags: tags_2,
            genres: genres_2,
            tracks: tracks_2,
            credits: credits_2,
            links: links_2,
            rating: rating_2,
            cover_url: cover_url_2,
            article_url: article_url_2,
        } = secondary;

        AlbumData {
            title: title.merge(title_2),
            artist: artist.merge(artist_2),
            mbid: mbid.merge(mbid_2),
            album_type: album_type.merge(album_type_2),
            release_date: release_date.merge(release_date_2),
            year: year.merge(year_2),
            label: label.merge(label_2),
            country: country.merge(country_2),
            track_count: track_count.merge(track_count_2),
            description: description.merge(description_2),
            description_summary: description_summary.merge(description_summary_2),
            tags: tags.merge(tags_2),
            genres: genres.merge(genres_2),
            tracks: tracks.merge(tracks_2),
            credits: credits.merge(credits_2),
            links: links.merge(links_2),
            rating: rating.merge(rating_2),
            cover_url: cover_url.merge(cover_url_2),
            article_url: article_url.merge(article_url_2),
        }
    }
}

impl Merge for ImageData {
    /// The primary image is kept; missing dimensions are only borrowed when
    /// both sides point at the same URL.
    fn merge(self, secondary: Self) -> Self {
        if self.url != secondary.url {
            return self;
        }
        ImageData {
            url: self.url,
            width: self.width.merge(secondary.width),
            height: self.height.merge(secondary.height),
            kind: self.kind,
        }
    }
}
