use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::SessionSettings;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "donor.toml";

pub fn load_settings(path: &Path) -> SessionSettings {
    load_settings_from(path, |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file if present, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> SessionSettings {
    let mut settings = SessionSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                for (key, value) in &file_cfg {
                    apply(&mut settings, key, value);
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("DONOR_SERVER_URL") {
        settings.server_url = v;
    }
    for (var, key) in [
        ("APP__SERVER_URL", "server_url"),
        ("APP__REQUEST_TIMEOUT_SECS", "request_timeout_secs"),
        ("APP__GEOLOCATION_TIMEOUT_SECS", "geolocation_timeout_secs"),
        ("APP__BANNER_DISMISS_SECS", "banner_dismiss_secs"),
        ("APP__NEXT_PAGE", "next_page"),
    ] {
        if let Some(v) = env(var) {
            apply(&mut settings, key, &v);
        }
    }

    settings
}

fn apply(settings: &mut SessionSettings, key: &str, value: &str) {
    match key {
        "server_url" => settings.server_url = value.to_string(),
        "next_page" => settings.next_page = value.to_string(),
        "request_timeout_secs" => {
            if let Some(secs) = parse_secs(key, value) {
                settings.request_timeout = secs;
            }
        }
        "geolocation_timeout_secs" => {
            if let Some(secs) = parse_secs(key, value) {
                settings.geolocation_timeout = secs;
            }
        }
        "banner_dismiss_secs" => {
            if let Some(secs) = parse_secs(key, value) {
                settings.banner_dismiss = secs;
            }
        }
        _ => warn!(key, "unknown setting"),
    }
}

fn parse_secs(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!(key, value, "expected whole seconds; keeping default");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
