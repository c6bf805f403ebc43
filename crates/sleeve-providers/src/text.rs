// SPDX-License-Identifier: GPL-3.0-or-later

//! Cleanup for free text returned by providers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").expect("valid tag regex");
    static ref LASTFM_LINK_TRAILER_REGEX: Regex =
        Regex::new(r#"(?is)\s*<a\s[^>]*last\.fm[^>]*>.*$"#).expect("valid last.fm link regex");
    static ref LASTFM_TEXT_TRAILER_REGEX: Regex =
        Regex::new(r"(?is)\s*(?:Read more on Last\.fm|User-contributed text is available).*$")
            .expect("valid last.fm trailer regex");
    static ref DISCOGS_NAMED_REGEX: Regex =
        Regex::new(r"\[(?:a|l|m|r)=(?P<name>[^\]]+)\]").expect("valid discogs named regex");
    static ref DISCOGS_URL_REGEX: Regex =
        Regex::new(r"(?s)\[url=[^\]]*\](?P<text>.*?)\[/url\]").expect("valid discogs url regex");
    static ref DISCOGS_ID_REGEX: Regex =
        Regex::new(r"\[(?:a|l|m|r)\d+\]").expect("valid discogs id regex");
    static ref DISCOGS_FORMAT_REGEX: Regex =
        Regex::new(r"\[/?[biu]\]").expect("valid discogs format regex");
    static ref DISCOGS_NAME_SUFFIX_REGEX: Regex =
        Regex::new(r"\s+\(\d+\)$").expect("valid discogs suffix regex");
    static ref BLANK_LINES_REGEX: Regex = Regex::new(r"\n{3,}").expect("valid blank lines regex");
}

/// Trimmed value, or `None` when nothing but whitespace is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Remove HTML tags and decode the handful of entities providers actually emit.
pub fn strip_html(value: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(value, "");
    decode_entities(&without_tags).trim().to_string()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Last.fm bios end with a "Read more on Last.fm" link and a licence note.
pub fn clean_lastfm_text(value: &str) -> Option<String> {
    let without_link = LASTFM_LINK_TRAILER_REGEX.replace(value, "");
    let stripped = strip_html(&without_link);
    let cleaned = LASTFM_TEXT_TRAILER_REGEX.replace(&stripped, "");
    non_blank(Some(cleaned.into_owned()))
}

/// Flatten Discogs profile markup (`[a=Name]`, `[l=Label]`, `[url=..]..[/url]`)
/// to plain text.
pub fn clean_discogs_markup(value: &str) -> Option<String> {
    let text = DISCOGS_URL_REGEX.replace_all(value, "$text");
    let text = DISCOGS_NAMED_REGEX.replace_all(&text, "$name");
    let text = DISCOGS_ID_REGEX.replace_all(&text, "");
    let text = DISCOGS_FORMAT_REGEX.replace_all(&text, "");
    let text = BLANK_LINES_REGEX.replace_all(&text, "\n\n");
    non_blank(Some(text.replace("\r\n", "\n")))
}

/// Discogs disambiguates homonyms as "Name (2)".
pub fn strip_discogs_suffix(name: &str) -> String {
    DISCOGS_NAME_SUFFIX_REGEX.replace(name.trim(), "").to_string()
}

/// Text up to and including the first sentence terminator, or all of it.
pub fn first_sentence(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .char_indices()
        .find(|&(index, ch)| {
            matches!(ch, '.' | '!' | '?')
                && trimmed[index + ch.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(index, ch)| trimmed[..index + ch.len_utf8()].to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
