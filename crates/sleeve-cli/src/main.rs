// SPDX-License-Identifier: GPL-3.0-or-later

mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{parse_batch, Args, BatchItem, Command};
use serde_json::{json, Value};
use sleeve_aggregator::{enrich_albums, enrich_artists, spawn_cache_sweeper, Aggregator};
use sleeve_config::{load as load_config, AppConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.telemetry.log_level);

    let aggregator = Aggregator::from_config(&config)?;
    let snapshot = snapshot_path(&config, args.no_cache_snapshot);
    if let Some(path) = snapshot {
        aggregator.cache().load_snapshot(path);
    }

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let sweeper_token = CancellationToken::new();
    let sweeper = (config.cache.sweep_interval_secs > 0).then(|| {
        spawn_cache_sweeper(
            aggregator.cache().clone(),
            Duration::from_secs(config.cache.sweep_interval_secs),
            sweeper_token.clone(),
        )
    });

    let output = run(&args.command, &aggregator, &config, &token).await;

    sweeper_token.cancel();
    if let Some(handle) = sweeper {
        if let Err(error) = handle.await {
            warn!(target: "cli", error = %error, "cache sweeper ended abnormally");
        }
    }
    if let Some(path) = snapshot {
        if let Err(error) = aggregator.cache().save_snapshot(path) {
            warn!(target: "cli", error = %error, "cache snapshot not saved");
        }
    }

    let output = output?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    if token.is_cancelled() {
        info!(target: "cli", "interrupted, results may be incomplete");
    }
    Ok(())
}

async fn run(
    command: &Command,
    aggregator: &Aggregator,
    config: &AppConfig,
    token: &CancellationToken,
) -> Result<Value> {
    let output = match command {
        Command::Artist(artist) => {
            serde_json::to_value(aggregator.fetch_artist_info(&artist.query(), token).await)?
        }
        Command::Album(album) => {
            serde_json::to_value(aggregator.fetch_album_info(&album.query(), token).await)?
        }
        Command::ArtistImage(artist) => {
            serde_json::to_value(aggregator.fetch_artist_image(&artist.query(), token).await)?
        }
        Command::ArtistBackground(artist) => serde_json::to_value(
            aggregator
                .fetch_artist_background(&artist.query(), token)
                .await,
        )?,
        Command::Cover(album) => {
            serde_json::to_value(aggregator.fetch_album_cover(&album.query(), token).await)?
        }
        Command::Batch { file, workers } => {
            let workers = workers.unwrap_or(config.batch.workers);
            run_batch(file, workers, aggregator, token).await?
        }
        Command::ClearCache => {
            let removed = aggregator.clear_all_caches();
            json!({ "removed": removed })
        }
    };
    Ok(output)
}

/// Artists and albums run as two pooled batches; the output keeps file order.
async fn run_batch(
    file: &Path,
    workers: usize,
    aggregator: &Aggregator,
    token: &CancellationToken,
) -> Result<Value> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let items = parse_batch(&contents);
    info!(target: "cli", items = items.len(), workers, "running batch");

    let mut artists = Vec::new();
    let mut albums = Vec::new();
    for item in &items {
        match item {
            BatchItem::Artist(query) => artists.push(query.clone()),
            BatchItem::Album(query) => albums.push(query.clone()),
        }
    }

    let mut artist_results = enrich_artists(aggregator, artists, workers, token)
        .await
        .into_iter();
    let mut album_results = enrich_albums(aggregator, albums, workers, token)
        .await
        .into_iter();

    let mut output = Vec::with_capacity(items.len());
    for item in items {
        let entry = match item {
            BatchItem::Artist(query) => json!({
                "artist": query.name,
                "result": artist_results.next().flatten(),
            }),
            BatchItem::Album(query) => json!({
                "artist": query.artist,
                "title": query.title,
                "result": album_results.next().flatten(),
            }),
        };
        output.push(entry);
    }
    Ok(Value::Array(output))
}

fn snapshot_path(config: &AppConfig, disabled: bool) -> Option<&Path> {
    if disabled {
        debug!(target: "cli", "cache snapshot disabled for this run");
        return None;
    }
    config.cache.snapshot_path.as_deref()
}

fn init_tracing(log_level: &str) {
    // stdout carries the JSON results, so logs go to stderr.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    #[cfg(not(unix))]
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    {
        interrupt.await.expect("ctrl_c handler");
    }

    info!(target: "cli", "shutdown signal received, cancelling lookups");
}
