// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Pacing for a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub min_interval_ms: u64,
}

impl RateLimitConfig {
    pub const fn new(requests_per_minute: u32, min_interval_ms: u64) -> Self {
        Self {
            requests_per_minute,
            min_interval_ms,
        }
    }

    /// No pacing at all. Intended for tests against local mock servers.
    pub const fn unlimited() -> Self {
        Self::new(0, 0)
    }

    /// Spacing actually enforced between two dispatches: the stricter of the
    /// explicit interval and the per-minute budget. `requests_per_minute == 0`
    /// means the budget is not limiting.
    pub fn effective_interval(&self) -> Duration {
        let from_budget = match self.requests_per_minute {
            0 => 0,
            rpm => 60_000 / u64::from(rpm),
        };
        Duration::from_millis(self.min_interval_ms.max(from_budget))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(30, 2_000)
    }
}

/// Static per-provider table with a conservative fallback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitTable {
    pub default: RateLimitConfig,
    #[serde(default)]
    pub providers: HashMap<String, RateLimitConfig>,
}

impl RateLimitTable {
    /// Table where every provider uses `config`.
    pub fn uniform(config: RateLimitConfig) -> Self {
        Self {
            default: config,
            providers: HashMap::new(),
        }
    }

    pub fn with_provider(mut self, name: impl Into<String>, config: RateLimitConfig) -> Self {
        self.providers.insert(name.into(), config);
        self
    }

    pub fn get(&self, provider: &str) -> RateLimitConfig {
        self.providers
            .get(provider)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for RateLimitTable {
    fn default() -> Self {
        let providers = [
            ("musicbrainz", RateLimitConfig::new(50, 1_000)),
            ("discogs", RateLimitConfig::new(60, 1_000)),
            ("wikipedia", RateLimitConfig::new(200, 100)),
            ("coverartarchive", RateLimitConfig::new(60, 1_000)),
            ("itunes", RateLimitConfig::new(20, 3_000)),
            ("lastfm", RateLimitConfig::new(300, 200)),
            ("theaudiodb", RateLimitConfig::new(30, 2_000)),
            ("deezer", RateLimitConfig::new(600, 100)),
            ("genius", RateLimitConfig::new(60, 500)),
            ("fanarttv", RateLimitConfig::new(60, 1_000)),
        ]
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect();

        Self {
            default: RateLimitConfig::default(),
            providers,
        }
    }
}
