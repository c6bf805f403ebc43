// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory TTL caches for aggregated results, one per entity kind.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sleeve_domain::{AlbumData, ArtistData, HasData, ImageData, SourcedResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SNAPSHOT_VERSION: u32 = 1;

/// A cached result and the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub result: SourcedResult<T>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Map of normalized query keys to results. Expired entries are misses and
/// are dropped when read or swept.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    ttl: chrono::Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            // Out-of-range TTLs are clamped to a century.
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!(target: "cache", cache = self.name, "cache mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, key: &str) -> Option<SourcedResult<T>> {
        let now = Utc::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(target: "cache", cache = self.name, key, "expired entry dropped");
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, result: SourcedResult<T>) {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.insert_entry(key, CacheEntry { result, expires_at });
    }

    /// Store an entry with its own expiry, as restored from a snapshot.
    pub fn insert_entry(&self, key: impl Into<String>, entry: CacheEntry<T>) {
        self.lock().insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove everything; returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Remove expired entries; returns how many were pruned.
    pub fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let initial_size = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        initial_size.saturating_sub(entries.len())
    }

    /// Copy of every unexpired entry.
    pub fn live_entries(&self) -> HashMap<String, CacheEntry<T>> {
        let now = Utc::now();
        self.lock()
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    fn restore(&self, entries: HashMap<String, CacheEntry<T>>) -> usize
    where
        T: HasData,
    {
        let now = Utc::now();
        let mut restored = 0;
        for (key, entry) in entries {
            // Snapshots are plain JSON; an edited file may hold empty payloads.
            if entry.is_expired(now) || !entry.result.data().has_data() {
                continue;
            }
            self.insert_entry(key, entry);
            restored += 1;
        }
        restored
    }
}

/// Lifetimes of cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Artist and album info.
    pub info: Duration,
    /// Artist images, backgrounds and album covers.
    pub image: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            info: Duration::from_secs(7 * 24 * 60 * 60),
            image: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// The five per-kind caches the aggregator reads before asking providers.
#[derive(Debug)]
pub struct MetadataCache {
    pub artist_info: TtlCache<ArtistData>,
    pub album_info: TtlCache<AlbumData>,
    pub artist_image: TtlCache<ImageData>,
    pub artist_background: TtlCache<ImageData>,
    pub album_cover: TtlCache<ImageData>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    artist_info: HashMap<String, CacheEntry<ArtistData>>,
    #[serde(default)]
    album_info: HashMap<String, CacheEntry<AlbumData>>,
    #[serde(default)]
    artist_image: HashMap<String, CacheEntry<ImageData>>,
    #[serde(default)]
    artist_background: HashMap<String, CacheEntry<ImageData>>,
    #[serde(default)]
    album_cover: HashMap<String, CacheEntry<ImageData>>,
}

impl MetadataCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            artist_info: TtlCache::new("artist_info", ttls.info),
            album_info: TtlCache::new("album_info", ttls.info),
            artist_image: TtlCache::new("artist_image", ttls.image),
            artist_background: TtlCache::new("artist_background", ttls.image),
            album_cover: TtlCache::new("album_cover", ttls.image),
        }
    }

    pub fn len(&self) -> usize {
        self.artist_info.len()
            + self.album_info.len()
            + self.artist_image.len()
            + self.artist_background.len()
            + self.album_cover.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear_all(&self) -> usize {
        let removed = self.artist_info.clear()
            + self.album_info.clear()
            + self.artist_image.clear()
            + self.artist_background.clear()
            + self.album_cover.clear();
        info!(target: "cache", removed, "all caches cleared");
        removed
    }

    pub fn clear_expired(&self) -> usize {
        let pruned = self.artist_info.clear_expired()
            + self.album_info.clear_expired()
            + self.artist_image.clear_expired()
            + self.artist_background.clear_expired()
            + self.album_cover.clear_expired();
        if pruned > 0 {
            debug!(target: "cache", pruned, "pruned expired cache entries");
        }
        pruned
    }

    /// Write every unexpired entry to `path` as JSON. The file is replaced
    /// atomically through a sibling temporary file.
    pub fn save_snapshot(&self, path: &Path) -> Result<usize> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            artist_info: self.artist_info.live_entries(),
            album_info: self.album_info.live_entries(),
            artist_image: self.artist_image.live_entries(),
            artist_background: self.artist_background.live_entries(),
            album_cover: self.album_cover.live_entries(),
        };
        let saved = snapshot.artist_info.len()
            + snapshot.album_info.len()
            + snapshot.artist_image.len()
            + snapshot.artist_background.len()
            + snapshot.album_cover.len();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_vec(&snapshot).context("failed to serialize cache snapshot")?;
        let temporary = path.with_extension("tmp");
        fs::write(&temporary, body)
            .with_context(|| format!("failed to write {}", temporary.display()))?;
        fs::rename(&temporary, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        info!(target: "cache", path = %path.display(), entries = saved, "cache snapshot saved");
        Ok(saved)
    }

    /// Restore entries saved by [`MetadataCache::save_snapshot`]. A missing,
    /// unreadable or malformed file leaves the cache as it was; expired
    /// entries are skipped. Returns the number of entries restored.
    pub fn load_snapshot(&self, path: &Path) -> usize {
        let body = match fs::read(path) {
            Ok(body) => body,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "cache", path = %path.display(), "no cache snapshot yet");
                return 0;
            }
            Err(error) => {
                warn!(target: "cache", path = %path.display(), error = %error, "cache snapshot unreadable, starting empty");
                return 0;
            }
        };

        let snapshot: Snapshot = match serde_json::from_slice(&body) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(target: "cache", path = %path.display(), error = %error, "cache snapshot corrupt, starting empty");
                return 0;
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(target: "cache", version = snapshot.version, "unsupported cache snapshot version, starting empty");
            return 0;
        }

        let restored = self.artist_info.restore(snapshot.artist_info)
            + self.album_info.restore(snapshot.album_info)
            + self.artist_image.restore(snapshot.artist_image)
            + self.artist_background.restore(snapshot.artist_background)
            + self.album_cover.restore(snapshot.album_cover);
        info!(
            target: "cache",
            path = %path.display(),
            restored,
            saved_at = %snapshot.saved_at,
            "cache snapshot loaded"
        );
        restored
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

/// Periodically drop expired entries until `token` is cancelled.
pub fn spawn_cache_sweeper(
    cache: Arc<MetadataCache>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(target: "cache", "cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    cache.clear_expired();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleeve_domain::{ImageKind, SourceInfo, Tier};

    fn cover(url: &str) -> SourcedResult<ImageData> {
        SourcedResult::new(
            ImageData::new(url, ImageKind::Cover),
            SourceInfo::new("coverartarchive", Tier::Professional),
        )
        .unwrap()
    }

    fn artist(bio: &str) -> SourcedResult<ArtistData> {
        SourcedResult::new(
            ArtistData {
                name: Some("Radiohead".to_string()),
                bio: Some(bio.to_string()),
                ..ArtistData::default()
            },
            SourceInfo::new("musicbrainz", Tier::Professional),
        )
        .unwrap()
    }

    #[test]
    fn test_hit_returns_stored_result() {
        let cache = TtlCache::new("album_cover", Duration::from_secs(60));
        cache.insert("radiohead\u{1f}ok computer", cover("https://caa.example/okc.jpg"));

        let hit = cache.get("radiohead\u{1f}ok computer").unwrap();
        assert_eq!(hit.data().url, "https://caa.example/okc.jpg");
        assert!(cache.get("radiohead\u{1f}kid a").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = TtlCache::new("album_cover", Duration::ZERO);
        cache.insert("key", cover("https://caa.example/a.jpg"));

        assert!(cache.get("key").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_expired_counts_pruned_entries() {
        let cache = MetadataCache::new(CacheTtls {
            info: Duration::from_secs(60),
            image: Duration::ZERO,
        });
        cache.artist_info.insert("radiohead", artist("English rock band."));
        cache.album_cover.insert("a", cover("https://caa.example/a.jpg"));
        cache.artist_image.insert("b", cover("https://caa.example/b.jpg"));

        assert_eq!(cache.clear_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear_all(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("snapshot.json");

        let cache = MetadataCache::default();
        cache.artist_info.insert("radiohead", artist("English rock band."));
        cache.album_cover.insert("radiohead\u{1f}ok computer", cover("https://caa.example/okc.jpg"));
        assert_eq!(cache.save_snapshot(&path).unwrap(), 2);

        let restored = MetadataCache::default();
        assert_eq!(restored.load_snapshot(&path), 2);
        assert_eq!(
            restored.artist_info.get("radiohead"),
            cache.artist_info.get("radiohead")
        );
        assert_eq!(
            restored.album_cover.get("radiohead\u{1f}ok computer").unwrap().source().name,
            "coverartarchive"
        );
    }

    #[test]
    fn test_snapshot_skips_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let cache = MetadataCache::default();
        cache.album_cover.insert_entry(
            "stale",
            CacheEntry {
                result: cover("https://caa.example/old.jpg"),
                expires_at: Utc::now() - chrono::Duration::hours(1),
            },
        );
        cache.album_cover.insert("fresh", cover("https://caa.example/new.jpg"));

        assert_eq!(cache.save_snapshot(&path).unwrap(), 1);
        let restored = MetadataCache::default();
        assert_eq!(restored.load_snapshot(&path), 1);
        assert!(restored.album_cover.get("stale").is_none());
    }

    #[test]
    fn test_corrupt_or_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let cache = MetadataCache::default();
        assert_eq!(cache.load_snapshot(&path), 0);

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(cache.load_snapshot(&path), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_prunes_until_cancelled() {
        let cache = Arc::new(MetadataCache::new(CacheTtls {
            info: Duration::ZERO,
            image: Duration::ZERO,
        }));
        cache.album_cover.insert("a", cover("https://caa.example/a.jpg"));

        let token = CancellationToken::new();
        let handle = spawn_cache_sweeper(cache.clone(), Duration::from_millis(20), token.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.is_empty());

        token.cancel();
        handle.await.unwrap();
    }
}
