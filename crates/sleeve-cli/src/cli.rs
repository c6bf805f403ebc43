// SPDX-License-Identifier: GPL-3.0-or-later

use clap::{Parser, Subcommand};
use sleeve_domain::{AlbumQuery, ArtistQuery};
use std::path::PathBuf;

/// Look up artist and album metadata across public music services.
#[derive(Debug, Parser)]
#[command(name = "sleeve", version)]
pub struct Args {
    /// TOML configuration file; `SLEEVE_*` environment variables override it
    #[arg(long, global = true, env = "SLEEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Neither load nor save the cache snapshot for this run
    #[arg(long, global = true)]
    pub no_cache_snapshot: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Artist biography, tags, members and similar artists
    Artist(ArtistArgs),
    /// Album details, tracklist and description
    Album(AlbumArgs),
    /// Artist portrait
    ArtistImage(ArtistArgs),
    /// Wide artist artwork
    ArtistBackground(ArtistArgs),
    /// Album cover
    Cover(AlbumArgs),
    /// Look up every line of FILE: `artist` or `artist - title`
    Batch {
        file: PathBuf,
        /// Concurrent lookups; defaults to `batch.workers`
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Drop every cached result
    ClearCache,
}

#[derive(Debug, clap::Args)]
pub struct ArtistArgs {
    pub name: String,
    /// MusicBrainz artist id, skips the name search where supported
    #[arg(long)]
    pub mbid: Option<String>,
}

impl ArtistArgs {
    pub fn query(&self) -> ArtistQuery {
        let query = ArtistQuery::new(self.name.trim());
        match self.mbid.as_deref() {
            Some(mbid) => query.with_mbid(mbid),
            None => query,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct AlbumArgs {
    pub artist: String,
    pub title: String,
    /// MusicBrainz release-group id
    #[arg(long)]
    pub mbid: Option<String>,
}

impl AlbumArgs {
    pub fn query(&self) -> AlbumQuery {
        let query = AlbumQuery::new(self.artist.trim(), self.title.trim());
        match self.mbid.as_deref() {
            Some(mbid) => query.with_mbid(mbid),
            None => query,
        }
    }
}

/// One line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItem {
    Artist(ArtistQuery),
    Album(AlbumQuery),
}

/// Blank lines and lines starting with `#` are skipped. The first ` - `
/// separates artist from title.
pub fn parse_batch(contents: &str) -> Vec<BatchItem> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(" - ") {
            Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
                BatchItem::Album(AlbumQuery::new(artist.trim(), title.trim()))
            }
            _ => BatchItem::Artist(ArtistQuery::new(line)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_lines() {
        let items = parse_batch(
            "# favourites\n\
             Radiohead\n\
             \n\
             Radiohead - OK Computer\n\
             Sigur Rós -   Ágætis byrjun  \n\
             Trailing - \n",
        );

        assert_eq!(
            items,
            vec![
                BatchItem::Artist(ArtistQuery::new("Radiohead")),
                BatchItem::Album(AlbumQuery::new("Radiohead", "OK Computer")),
                BatchItem::Album(AlbumQuery::new("Sigur Rós", "Ágætis byrjun")),
                BatchItem::Artist(ArtistQuery::new("Trailing -")),
            ]
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "sleeve",
            "album",
            "Radiohead",
            "OK Computer",
            "--mbid",
            "b1392450-e666-3926-a536-22c65f834433",
            "--no-cache-snapshot",
        ])
        .unwrap();

        assert!(args.no_cache_snapshot);
        let Command::Album(album) = args.command else {
            panic!("expected album command");
        };
        assert_eq!(
            album.query().mbid.as_deref(),
            Some("b1392450-e666-3926-a536-22c65f834433")
        );
    }

    #[test]
    fn test_artist_name_is_trimmed() {
        let args = Args::try_parse_from(["sleeve", "artist-image", "  Björk "]).unwrap();
        let Command::ArtistImage(artist) = args.command else {
            panic!("expected artist-image command");
        };
        assert_eq!(artist.query(), ArtistQuery::new("Björk"));
    }
}
