// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz web service (`/ws/2`): artist and release-group search and
//! lookup, plus MBID resolution for the image providers keyed on it.

use crate::error::Result;
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::matching::{best_match, match_score};
use crate::rate_limiter::RequestQueues;
use crate::text::non_blank;
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sleeve_domain::{
    AlbumData, AlbumQuery, Appended, ArtistData, ArtistQuery, Credit, Link, Ranked, SourceInfo,
    SourcedResult, TagList, Tier, Track,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

const NAME: &str = "musicbrainz";
pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const SEARCH_LIMIT: &str = "5";

#[derive(Debug, Clone)]
pub struct MusicBrainzProvider {
    http: ProviderHttp,
}

impl MusicBrainzProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        debug!(target: "musicbrainz", base_url = %settings.base_url, "initialized MusicBrainz provider");
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    /// MBID for the artist: the query's own when it is a valid UUID, otherwise
    /// the best search hit.
    #[instrument(skip(self, token), fields(artist = %query.name))]
    pub async fn resolve_artist_mbid(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<String>> {
        if let Some(mbid) = valid_mbid(query.mbid.as_deref()) {
            return Ok(Some(mbid));
        }
        if self.http.cancelled(token, "artist search") {
            return Ok(None);
        }

        let url = self.http.url("/artist");
        let request = self.http.get(&url).query(&[
            ("query", format!("artist:\"{}\"", lucene_escape(&query.name))),
            ("fmt", "json".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ]);
        let search: ArtistSearch = self.http.send(request).await?;

        let best = best_match(search.artists, |artist| match_score(&artist.name, &query.name));
        Ok(best.map(|artist| artist.id))
    }

    /// MBID of the release group for the album.
    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    pub async fn resolve_release_group_mbid(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<String>> {
        if let Some(mbid) = valid_mbid(query.mbid.as_deref()) {
            return Ok(Some(mbid));
        }
        if self.http.cancelled(token, "release-group search") {
            return Ok(None);
        }

        let url = self.http.url("/release-group");
        let request = self.http.get(&url).query(&[
            (
                "query",
                format!(
                    "releasegroup:\"{}\" AND artist:\"{}\"",
                    lucene_escape(&query.title),
                    lucene_escape(&query.artist)
                ),
            ),
            ("fmt", "json".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ]);
        let search: ReleaseGroupSearch = self.http.send(request).await?;

        let best = best_match(search.release_groups, |group| {
            match_score(&group.title, &query.title)
                + match_score(&credited_artist(&group.artist_credit), &query.artist)
        });
        Ok(best.map(|group| group.id))
    }

    async fn fetch_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<ArtistData>> {
        let Some(mbid) = self.resolve_artist_mbid(query, token).await? else {
            return Ok(None);
        };
        if self.http.cancelled(token, "artist lookup") {
            return Ok(None);
        }

        let url = self.http.url(&format!("/artist/{mbid}"));
        debug!(target: "musicbrainz", url = %url, "fetching artist detail");
        let request = self
            .http
            .get(&url)
            .query(&[("fmt", "json"), ("inc", "url-rels+artist-rels+tags+genres")]);
        let artist: ArtistDetail = self.http.send(request).await?;

        Ok(Some(artist.into_data()))
    }

    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        let Some(mbid) = self.resolve_release_group_mbid(query, token).await? else {
            return Ok(None);
        };
        if self.http.cancelled(token, "release-group lookup") {
            return Ok(None);
        }

        let url = self.http.url(&format!("/release-group/{mbid}"));
        debug!(target: "musicbrainz", url = %url, "fetching release-group detail");
        let request = self.http.get(&url).query(&[
            ("fmt", "json"),
            ("inc", "artist-credits+url-rels+tags+genres+releases"),
        ]);
        let group: ReleaseGroupDetail = self.http.send(request).await?;

        // Track listing, label and country live on a concrete release.
        let release = match group.releases.iter().find_map(|release| release.id.clone()) {
            Some(release_id) if !self.http.cancelled(token, "release lookup") => {
                let url = self.http.url(&format!("/release/{release_id}"));
                let request = self
                    .http
                    .get(&url)
                    .query(&[("fmt", "json"), ("inc", "recordings+labels")]);
                Some(self.http.send::<ReleaseDetail>(request).await?)
            }
            _ => None,
        };

        Ok(Some(group.into_data(release)))
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Professional)
    }

    async fn artist_info(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ArtistData>> {
        let data = settle(NAME, "artist_info", self.fetch_artist(query, token).await)?;
        SourcedResult::new(data, self.source())
    }

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, self.source())
    }
}

fn valid_mbid(mbid: Option<&str>) -> Option<String> {
    let mbid = mbid?.trim();
    Uuid::parse_str(mbid).ok().map(|uuid| uuid.to_string())
}

/// Escape Lucene query syntax inside a quoted phrase.
fn lucene_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn credited_artist(credits: &[ArtistCredit]) -> String {
    credits
        .iter()
        .map(|credit| format!("{}{}", credit.name, credit.joinphrase.as_deref().unwrap_or("")))
        .collect::<String>()
        .trim()
        .to_string()
}

fn tag_names(mut tags: Vec<NamedCount>) -> TagList {
    // Stable sort keeps the service's order among equally voted tags.
    tags.sort_by(|a, b| b.count.unwrap_or(0).cmp(&a.count.unwrap_or(0)));
    tags.into_iter().map(|tag| tag.name).collect()
}

fn split_relations(relations: Vec<Relation>) -> (Appended<Link>, Option<String>, Vec<Relation>) {
    let mut links = Appended::default();
    let mut article_url = None;
    let mut rest = Vec::new();

    for relation in relations {
        match relation.url.as_ref().map(|url| url.resource.clone()) {
            Some(resource) if relation.kind == "wikipedia" => {
                article_url.get_or_insert(resource);
            }
            Some(resource) => links.push(Link::new(relation.kind.clone(), resource)),
            None => rest.push(relation),
        }
    }

    (links, article_url, rest)
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    #[serde(default)]
    artists: Vec<ArtistSummary>,
}

#[derive(Debug, Deserialize)]
struct ArtistSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupSearch {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<ReleaseGroupSummary>,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupSummary {
    id: String,
    title: String,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCount {
    name: String,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LifeSpan {
    begin: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UrlTarget {
    resource: String,
}

#[derive(Debug, Deserialize)]
struct RelatedArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    url: Option<UrlTarget>,
    #[serde(default)]
    artist: Option<RelatedArtist>,
}

#[derive(Debug, Deserialize)]
struct ArtistDetail {
    id: String,
    name: String,
    #[serde(rename = "type")]
    artist_type: Option<String>,
    country: Option<String>,
    #[serde(rename = "life-span")]
    life_span: Option<LifeSpan>,
    #[serde(default)]
    tags: Vec<NamedCount>,
    #[serde(default)]
    genres: Vec<NamedCount>,
    #[serde(default)]
    relations: Vec<Relation>,
}

impl ArtistDetail {
    fn into_data(self) -> ArtistData {
        let (links, article_url, rest) = split_relations(self.relations);

        let mut members: Vec<String> = Vec::new();
        for relation in rest {
            let is_member = relation.kind == "member of band"
                && relation.direction.as_deref() == Some("backward");
            if let (true, Some(artist)) = (is_member, relation.artist) {
                if !members.contains(&artist.name) {
                    members.push(artist.name);
                }
            }
        }

        let (begin_date, end_date) = self
            .life_span
            .map(|span| (non_blank(span.begin), non_blank(span.end)))
            .unwrap_or_default();

        ArtistData {
            name: Some(self.name),
            mbid: Some(self.id),
            artist_type: non_blank(self.artist_type),
            country: non_blank(self.country),
            begin_date,
            end_date,
            tags: tag_names(self.tags),
            genres: tag_names(self.genres),
            members: Ranked::from(members),
            links,
            article_url,
            ..ArtistData::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupDetail {
    id: String,
    title: String,
    #[serde(rename = "primary-type")]
    primary_type: Option<String>,
    #[serde(rename = "first-release-date")]
    first_release_date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    tags: Vec<NamedCount>,
    #[serde(default)]
    genres: Vec<NamedCount>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    releases: Vec<ReleaseRef>,
}

impl ReleaseGroupDetail {
    fn into_data(self, release: Option<ReleaseDetail>) -> AlbumData {
        let (links, article_url, _) = split_relations(self.relations);
        let release_date = non_blank(self.first_release_date);
        let year = release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok());
        let artist = non_blank(Some(credited_artist(&self.artist_credit)));

        let mut album = AlbumData {
            title: Some(self.title),
            artist,
            mbid: Some(self.id),
            album_type: non_blank(self.primary_type),
            release_date,
            year,
            tags: tag_names(self.tags),
            genres: tag_names(self.genres),
            links,
            article_url,
            ..AlbumData::default()
        };

        if let Some(release) = release {
            album.country = non_blank(release.country);
            album.label = release
                .label_info
                .into_iter()
                .find_map(|info| info.label.map(|label| label.name));
            let tracks: Vec<Track> = release
                .media
                .into_iter()
                .flat_map(|medium| medium.tracks)
                .map(|track| Track {
                    position: track.number,
                    title: track.title,
                    duration_secs: track.length.map(|ms| ms / 1_000),
                })
                .collect();
            if !tracks.is_empty() {
                album.track_count = u32::try_from(tracks.len()).ok();
            }
            album.tracks = Ranked::from(tracks);
            album.credits = release
                .artist_credit
                .iter()
                .map(|credit| Credit {
                    name: credit.name.clone(),
                    role: Some("artist".to_string()),
                })
                .collect();
        }

        album
    }
}

#[derive(Debug, Deserialize)]
struct LabelName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LabelInfo {
    label: Option<LabelName>,
}

#[derive(Debug, Deserialize)]
struct ReleaseTrack {
    number: Option<String>,
    title: String,
    length: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Medium {
    #[serde(default)]
    tracks: Vec<ReleaseTrack>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDetail {
    country: Option<String>,
    #[serde(rename = "label-info", default)]
    label_info: Vec<LabelInfo>,
    #[serde(default)]
    media: Vec<Medium>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mbid() {
        assert_eq!(
            valid_mbid(Some(" a74b1b7f-71a5-4011-9441-d0b5e4122711 ")).as_deref(),
            Some("a74b1b7f-71a5-4011-9441-d0b5e4122711")
        );
        assert_eq!(valid_mbid(Some("not-a-uuid")), None);
        assert_eq!(valid_mbid(None), None);
    }

    #[test]
    fn test_lucene_escape() {
        assert_eq!(lucene_escape(r#"12" Single"#), r#"12\" Single"#);
    }

    #[test]
    fn test_credited_artist_joins_phrases() {
        let credits = vec![
            ArtistCredit {
                name: "Simon".to_string(),
                joinphrase: Some(" & ".to_string()),
            },
            ArtistCredit {
                name: "Garfunkel".to_string(),
                joinphrase: None,
            },
        ];
        assert_eq!(credited_artist(&credits), "Simon & Garfunkel");
    }
}
