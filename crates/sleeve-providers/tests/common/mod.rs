// SPDX-License-Identifier: GPL-3.0-or-later
#![allow(dead_code)]

use sleeve_providers::{ProviderSettings, RequestQueues};
use wiremock::MockServer;

pub const RADIOHEAD_MBID: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";
pub const OK_COMPUTER_MBID: &str = "b1392450-e666-3926-a536-22c65f834433";

pub fn settings(server: &MockServer) -> ProviderSettings {
    ProviderSettings::new(server.uri())
}

pub fn keyed_settings(server: &MockServer, key: &str) -> ProviderSettings {
    ProviderSettings::new(server.uri()).api_key(Some(key))
}

/// No pacing: the mock servers are local.
pub fn queues() -> RequestQueues {
    RequestQueues::unlimited()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}
