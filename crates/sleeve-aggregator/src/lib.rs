// SPDX-License-Identifier: GPL-3.0-or-later

//! The aggregation engine: ordered provider fallback, the TTL cache in front
//! of it, text and similar-artist enrichment, and a bounded batch runner.

pub mod batch;
pub mod cache;
pub mod enrichment;
pub mod facade;
pub mod fallback;
pub mod roster;

pub use batch::{enrich_albums, enrich_artists};
pub use cache::{spawn_cache_sweeper, CacheEntry, CacheTtls, MetadataCache, TtlCache};
pub use enrichment::Enricher;
pub use facade::{Aggregator, AggregatorBuilder, ProviderChains};
pub use fallback::FallbackChain;
pub use roster::{build_roster, Roster};
