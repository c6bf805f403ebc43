// SPDX-License-Identifier: GPL-3.0-or-later

//! Bounded-concurrency bulk lookups.
//!
//! At most `workers` lookups are in flight at once. Results come back in input
//! order; items reached after the token fires are skipped and yield `None`.

use crate::facade::Aggregator;
use futures::stream::{self, StreamExt};
use sleeve_domain::{AlbumData, AlbumQuery, ArtistData, ArtistQuery, SourcedResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub async fn enrich_artists(
    aggregator: &Aggregator,
    queries: Vec<ArtistQuery>,
    workers: usize,
    token: &CancellationToken,
) -> Vec<Option<SourcedResult<ArtistData>>> {
    let workers = workers.max(1);
    let total = queries.len();
    info!(target: "batch", total, workers, "enriching artists");

    let results: Vec<_> = stream::iter(queries)
        .map(|query| async move {
            if token.is_cancelled() {
                debug!(target: "batch", artist = %query.name, "cancelled, item skipped");
                return None;
            }
            aggregator.fetch_artist_info(&query, token).await
        })
        .buffered(workers)
        .collect()
        .await;

    log_summary("artists", &results);
    results
}

pub async fn enrich_albums(
    aggregator: &Aggregator,
    queries: Vec<AlbumQuery>,
    workers: usize,
    token: &CancellationToken,
) -> Vec<Option<SourcedResult<AlbumData>>> {
    let workers = workers.max(1);
    let total = queries.len();
    info!(target: "batch", total, workers, "enriching albums");

    let results: Vec<_> = stream::iter(queries)
        .map(|query| async move {
            if token.is_cancelled() {
                debug!(target: "batch", album = %query.title, "cancelled, item skipped");
                return None;
            }
            aggregator.fetch_album_info(&query, token).await
        })
        .buffered(workers)
        .collect()
        .await;

    log_summary("albums", &results);
    results
}

fn log_summary<T>(kind: &str, results: &[Option<T>]) {
    let found = results.iter().filter(|result| result.is_some()).count();
    info!(
        target: "batch",
        kind,
        total = results.len(),
        found,
        missing = results.len() - found,
        "batch finished"
    );
}
