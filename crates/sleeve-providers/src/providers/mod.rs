// SPDX-License-Identifier: GPL-3.0-or-later

mod coverartarchive;
mod deezer;
mod discogs;
mod fanarttv;
mod genius;
mod itunes;
mod lastfm;
mod musicbrainz;
mod theaudiodb;
mod wikipedia;

pub use coverartarchive::CoverArtArchiveProvider;
pub use deezer::DeezerProvider;
pub use discogs::DiscogsProvider;
pub use fanarttv::FanartTvProvider;
pub use genius::GeniusProvider;
pub use itunes::ITunesProvider;
pub use lastfm::LastFmProvider;
pub use musicbrainz::MusicBrainzProvider;
pub use theaudiodb::TheAudioDbProvider;
pub use wikipedia::WikipediaProvider;
