// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{ProviderError, Result};
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::matching::{best_match, match_score};
use crate::rate_limiter::RequestQueues;
use crate::text::{first_sentence, non_blank};
use crate::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use sleeve_domain::{
    AlbumData, AlbumQuery, Appended, ArtistData, ArtistQuery, ImageData, ImageKind, Link, Rating,
    SourceInfo, SourcedResult, TagList, Tier,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "theaudiodb";
pub const DEFAULT_BASE_URL: &str = "https://www.theaudiodb.com/api/v1/json";

/// TheAudioDB. The API key is part of the path; every field is a string or
/// null, and "not found" is a `null` list.
#[derive(Debug, Clone)]
pub struct TheAudioDbProvider {
    http: ProviderHttp,
}

impl TheAudioDbProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL).api_key(Some("2"))
    }

    fn endpoint(&self, script: &str) -> Result<String> {
        let key = self
            .http
            .api_key()
            .ok_or(ProviderError::MissingField("api_key"))?;
        Ok(self.http.url(&format!("/{key}/{script}")))
    }

    #[instrument(skip(self, token), fields(artist = %query.name))]
    async fn find_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<Record>> {
        if self.http.cancelled(token, "artist search") {
            return Ok(None);
        }

        let request = match query.mbid.as_deref() {
            Some(mbid) => self
                .http
                .get(&self.endpoint("artist-mb.php")?)
                .query(&[("i", mbid)]),
            None => self
                .http
                .get(&self.endpoint("search.php")?)
                .query(&[("s", query.name.as_str())]),
        };
        let body = self.http.send_json(request).await?;

        Ok(best_match(records(&body, "artists"), |artist| {
            match_score(&artist.text("strArtist").unwrap_or_default(), &query.name)
        }))
    }

    #[instrument(skip(self, token), fields(artist = %query.artist, album = %query.title))]
    async fn find_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<Record>> {
        if self.http.cancelled(token, "album search") {
            return Ok(None);
        }

        let request = self
            .http
            .get(&self.endpoint("searchalbum.php")?)
            .query(&[("s", query.artist.as_str()), ("a", query.title.as_str())]);
        let body = self.http.send_json(request).await?;

        Ok(best_match(records(&body, "album"), |album| {
            match_score(&album.text("strAlbum").unwrap_or_default(), &query.title)
        }))
    }

    async fn fetch_artist(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Result<Option<ArtistData>> {
        Ok(self.find_artist(query, token).await?.map(|artist| artist.into_artist()))
    }

    async fn fetch_album(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Result<Option<AlbumData>> {
        Ok(self.find_album(query, token).await?.map(|album| album.into_album()))
    }

    async fn fetch_artist_image(
        &self,
        query: &ArtistQuery,
        fields: &[(&str, ImageKind)],
        token: &CancellationToken,
    ) -> Result<Option<ImageData>> {
        let Some(artist) = self.find_artist(query, token).await? else {
            return Ok(None);
        };
        debug!(target: "theaudiodb", artist = %query.name, "artist found, picking image");
        Ok(fields
            .iter()
            .find_map(|(field, kind)| artist.text(field).map(|url| ImageData::new(url, *kind))))
    }
}

#[async_trait]
impl MetadataProvider for TheAudioDbProvider {
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

    async fn album_info(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<AlbumData>> {
        let data = settle(NAME, "album_info", self.fetch_album(query, token).await)?;
        SourcedResult::new(data, self.source())
    }

    async fn artist_image(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let fields = [("strArtistThumb", ImageKind::Thumb)];
        let image = settle(
            NAME,
            "artist_image",
            self.fetch_artist_image(query, &fields, token).await,
        )?;
        SourcedResult::new(image, self.source())
    }

    async fn artist_background(
        &self,
        query: &ArtistQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let fields = [
            ("strArtistFanart", ImageKind::Fanart),
            ("strArtistFanart2", ImageKind::Fanart),
            ("strArtistWideThumb", ImageKind::Banner),
        ];
        let image = settle(
            NAME,
            "artist_background",
            self.fetch_artist_image(query, &fields, token).await,
        )?;
        SourcedResult::new(image, self.source())
    }

    async fn album_cover(
        &self,
        query: &AlbumQuery,
        token: &CancellationToken,
    ) -> Option<SourcedResult<ImageData>> {
        let album = settle(NAME, "album_cover", self.find_album(query, token).await)?;
        let url = album.text("strAlbumThumb")?;
        SourcedResult::new(ImageData::new(url, ImageKind::Cover), self.source())
    }
}

fn records(body: &Value, list: &str) -> Vec<Record> {
    body.get(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(Record))
                .collect()
        })
        .unwrap_or_default()
}

/// One row of a TheAudioDB response.
#[derive(Debug, Clone)]
struct Record(Map<String, Value>);

impl Record {
    /// Field as text; numbers are accepted, blanks are not.
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(text) => non_blank(Some(text.clone())),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    fn year(&self, key: &str) -> Option<String> {
        self.text(key).filter(|year| year != "0")
    }

    fn into_artist(self) -> ArtistData {
        let bio = self.text("strBiographyEN");
        let mut tags = TagList::new();
        for key in ["strStyle", "strMood"] {
            if let Some(tag) = self.text(key) {
                tags.push(tag);
            }
        }
        let mut links = Appended::default();
        for (label, key) in [("website", "strWebsite"), ("facebook", "strFacebook"), ("twitter", "strTwitter")] {
            if let Some(url) = self.text(key) {
                links.push(Link::new(label, with_scheme(&url)));
            }
        }
        let disbanded = self
            .text("strDisbanded")
            .is_some_and(|value| value.eq_ignore_ascii_case("yes"));

        ArtistData {
            name: self.text("strArtist"),
            mbid: self.text("strMusicBrainzID"),
            country: self.text("strCountry"),
            begin_date: self.year("intFormedYear").or_else(|| self.year("intBornYear")),
            end_date: self
                .year("intDiedYear")
                .or_else(|| disbanded.then(|| self.year("intDisbandedYear")).flatten()),
            bio_summary: bio.as_deref().map(first_sentence),
            bio,
            genres: self.text("strGenre").into_iter().collect(),
            tags,
            links,
            image_url: self.text("strArtistThumb"),
            ..ArtistData::default()
        }
    }

    fn into_album(self) -> AlbumData {
        let description = self.text("strDescriptionEN");
        let year = self
            .year("intYearReleased")
            .and_then(|year| year.parse().ok());
        let rating = self
            .text("intScore")
            .and_then(|score| score.parse::<f32>().ok())
            .map(|value| Rating {
                value,
                votes: self.text("intScoreVotes").and_then(|votes| votes.parse().ok()),
            });
        let mut tags = TagList::new();
        for key in ["strStyle", "strMood", "strSpeed", "strTheme"] {
            if let Some(tag) = self.text(key) {
                tags.push(tag);
            }
        }

        AlbumData {
            title: self.text("strAlbum"),
            artist: self.text("strArtist"),
            mbid: self.text("strMusicBrainzID"),
            album_type: self.text("strReleaseFormat"),
            year,
            label: self.text("strLabel"),
            description_summary: description.as_deref().map(first_sentence),
            description,
            genres: self.text("strGenre").into_iter().collect(),
            tags,
            rating,
            cover_url: self.text("strAlbumThumb"),
            ..AlbumData::default()
        }
    }
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
