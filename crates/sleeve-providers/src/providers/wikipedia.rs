// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use crate::http::{settle, ProviderHttp, ProviderSettings};
use crate::rate_limiter::RequestQueues;
use crate::text::{first_sentence, non_blank};
use crate::{BiographySource, TextSummary};
use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde::Deserialize;
use sleeve_domain::{SourceInfo, Tier};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const NAME: &str = "wikipedia";
pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

/// Characters left alone in a page title path segment.
const TITLE_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'~');

/// Wikipedia REST API, used as the encyclopedic text source.
#[derive(Debug, Clone)]
pub struct WikipediaProvider {
    http: ProviderHttp,
}

impl WikipediaProvider {
    pub const NAME: &'static str = NAME;

    pub fn new(client: Client, queues: RequestQueues, settings: ProviderSettings) -> Self {
        Self {
            http: ProviderHttp::new(NAME, client, queues, settings),
        }
    }

    pub fn default_settings() -> ProviderSettings {
        ProviderSettings::new(DEFAULT_BASE_URL)
    }

    #[instrument(skip(self, token))]
    async fn fetch_summary(
        &self,
        title: &str,
        token: &CancellationToken,
    ) -> Result<Option<TextSummary>> {
        if self.http.cancelled(token, "page summary") {
            return Ok(None);
        }

        let encoded = utf8_percent_encode(&title.replace(' ', "_"), TITLE_SEGMENT).to_string();
        let url = self.http.url(&format!("/api/rest_v1/page/summary/{encoded}"));
        debug!(target: "wikipedia", url = %url, "fetching page summary");
        let page: PageSummary = self.http.send(self.http.get(&url)).await?;

        if page.kind.as_deref() == Some("disambiguation") {
            debug!(target: "wikipedia", title, "skipping disambiguation page");
            return Ok(None);
        }

        let Some(text) = non_blank(page.extract) else {
            return Ok(None);
        };
        let url = page
            .content_urls
            .and_then(|urls| urls.desktop)
            .and_then(|desktop| non_blank(desktop.page));

        Ok(Some(TextSummary {
            summary: Some(first_sentence(&text)),
            text,
            url,
        }))
    }

    #[instrument(skip(self, token))]
    async fn search(&self, term: &str, token: &CancellationToken) -> Result<Option<TextSummary>> {
        if self.http.cancelled(token, "page search") {
            return Ok(None);
        }

        let url = self.http.url("/w/rest.php/v1/search/page");
        let request = self.http.get(&url).query(&[("q", term), ("limit", "1")]);
        let results: SearchResults = self.http.send(request).await?;

        let Some(page) = results.pages.into_iter().next() else {
            return Ok(None);
        };
        self.fetch_summary(&page.key, token).await
    }
}

#[async_trait]
impl BiographySource for WikipediaProvider {
    fn source(&self) -> SourceInfo {
        SourceInfo::new(NAME, Tier::Professional)
    }

    async fn summary_by_reference(
        &self,
        reference: &str,
        token: &CancellationToken,
    ) -> Option<TextSummary> {
        let title = title_from_reference(reference)?;
        settle(NAME, "summary_by_reference", self.fetch_summary(&title, token).await)
    }

    async fn search_summary(&self, term: &str, token: &CancellationToken) -> Option<TextSummary> {
        settle(NAME, "search_summary", self.search(term, token).await)
    }
}

/// Page title from an article URL (`.../wiki/Title`) or a bare title.
fn title_from_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let raw = match reference.split_once("/wiki/") {
        Some((_, title)) => title.split(['#', '?']).next().unwrap_or(title),
        None if reference.contains("://") => return None,
        None => reference,
    };
    let title = percent_decode_str(raw).decode_utf8_lossy().replace('_', " ");
    non_blank(Some(title))
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    pages: Vec<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    key: String,
}

#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<DesktopUrls>,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type")]
    kind: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_reference() {
        assert_eq!(
            title_from_reference("https://en.wikipedia.org/wiki/OK_Computer").as_deref(),
            Some("OK Computer")
        );
        assert_eq!(
            title_from_reference("https://en.wikipedia.org/wiki/Sigur_R%C3%B3s#History").as_deref(),
            Some("Sigur Rós")
        );
        assert_eq!(title_from_reference("Radiohead").as_deref(), Some("Radiohead"));
        assert_eq!(title_from_reference("https://example.org/page"), None);
        assert_eq!(title_from_reference("  "), None);
    }
}
