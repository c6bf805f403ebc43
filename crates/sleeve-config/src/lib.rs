// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sleeve_domain::{RateLimitTable, DEFAULT_USER_AGENT};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Descriptive client identifier sent to every provider.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Overrides `http.timeout_secs` for this provider.
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::default()
        }
    }

    /// The configured key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self, http: &HttpConfig) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(http.timeout_secs))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub musicbrainz: ProviderConfig,
    pub discogs: ProviderConfig,
    pub wikipedia: ProviderConfig,
    pub coverartarchive: ProviderConfig,
    pub itunes: ProviderConfig,
    pub lastfm: ProviderConfig,
    pub theaudiodb: ProviderConfig,
    pub deezer: ProviderConfig,
    pub genius: ProviderConfig,
    pub fanarttv: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            musicbrainz: ProviderConfig::default(),
            discogs: ProviderConfig::default(),
            wikipedia: ProviderConfig::default(),
            coverartarchive: ProviderConfig::default(),
            itunes: ProviderConfig::default(),
            lastfm: ProviderConfig::default(),
            // TheAudioDB publishes "2" as its free development key.
            theaudiodb: ProviderConfig::with_api_key("2"),
            deezer: ProviderConfig::default(),
            genius: ProviderConfig::default(),
            fanarttv: ProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub info_ttl_secs: u64,
    pub image_ttl_secs: u64,
    /// Period of the background expiry sweep; `0` disables it.
    pub sweep_interval_secs: u64,
    /// JSON file the cache is persisted to between runs.
    pub snapshot_path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn info_ttl(&self) -> Duration {
        Duration::from_secs(self.info_ttl_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            info_ttl_secs: 7 * 24 * 60 * 60,
            image_ttl_secs: 30 * 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Bios and descriptions shorter than this many characters count as thin.
    pub min_text_length: usize,
    pub biography: bool,
    pub similar_artists: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            min_text_length: 100,
            biography: true,
            similar_artists: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub rate_limits: RateLimitTable,
    pub cache: CacheConfig,
    pub enrichment: EnrichmentConfig,
    pub batch: BatchConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: SLEEVE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config: AppConfig = figment(config_path).extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::prefixed("SLEEVE_").split("__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use sleeve_domain::RateLimitConfig;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.info_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.cache.image_ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.enrichment.min_text_length, 100);
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.providers.theaudiodb.api_key(), Some("2"));
        assert_eq!(config.providers.lastfm.api_key(), None);
        assert_eq!(
            config.rate_limits.get("musicbrainz"),
            RateLimitConfig::new(50, 1_000)
        );
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let provider = ProviderConfig {
            api_key: Some("   ".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.api_key(), None);
    }

    #[test]
    fn test_provider_timeout_falls_back_to_http() {
        let http = HttpConfig::default();
        let provider = ProviderConfig {
            timeout_secs: Some(15),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.timeout(&http), Duration::from_secs(15));
        assert_eq!(ProviderConfig::default().timeout(&http), Duration::from_secs(10));
    }

    #[test]
    fn test_toml_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sleeve.toml",
                r#"
                [providers.lastfm]
                api_key = "from-file"

                [rate_limits.providers.lastfm]
                requests_per_minute = 120
                min_interval_ms = 500

                [cache]
                info_ttl_secs = 60
                "#,
            )?;
            jail.set_env("SLEEVE_PROVIDERS__DISCOGS__ENABLED", "false");
            jail.set_env("SLEEVE_BATCH__WORKERS", "2");

            let config: AppConfig = figment(Some(Path::new("sleeve.toml"))).extract()?;

            assert_eq!(config.providers.lastfm.api_key(), Some("from-file"));
            assert!(!config.providers.discogs.enabled);
            assert_eq!(config.batch.workers, 2);
            assert_eq!(config.cache.info_ttl_secs, 60);
            assert_eq!(
                config.rate_limits.get("lastfm"),
                RateLimitConfig::new(120, 500)
            );
            // Entries not named in the file keep their defaults.
            assert_eq!(
                config.rate_limits.get("deezer"),
                RateLimitConfig::new(600, 100)
            );
            Ok(())
        });
    }
}
