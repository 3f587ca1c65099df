use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub data_path: String,
    pub catalog_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            data_path: "data/ngo_info_by_city_with_volunteers.json".into(),
            catalog_path: "data/items_catalog.json".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file if present, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    apply_env(&mut settings, env);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("data_path") {
        settings.data_path = v.clone();
    }
    if let Some(v) = file_cfg.get("catalog_path") {
        settings.catalog_path = v.clone();
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__DATA_PATH") {
        settings.data_path = v;
    }

    if let Some(v) = env("APP__CATALOG_PATH") {
        settings.catalog_path = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
