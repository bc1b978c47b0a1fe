use std::{collections::HashMap, fs};

use server_api::DEFAULT_MAX_UPLOAD_BYTES;
use shared::domain::DEFAULT_BUCKET;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub bucket: String,
    pub max_upload_bytes: usize,
    pub classifier_label: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3001".into(),
            database_url: "sqlite://./data/objects.db".into(),
            bucket: DEFAULT_BUCKET.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            classifier_label: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("server.toml").ok();
    settings_from_sources(file_cfg.as_deref(), |name| std::env::var(name).ok())
}

/// Layers `server.toml` (flat string table) and then environment variables
/// over the defaults. Unparseable values keep the previous layer's value.
pub fn settings_from_sources(
    file_cfg: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_cfg {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("bucket") {
                settings.bucket = v.clone();
            }
            if let Some(v) = file_cfg.get("max_upload_bytes") {
                if let Ok(parsed) = v.parse::<usize>() {
                    settings.max_upload_bytes = parsed;
                }
            }
            if let Some(v) = file_cfg.get("classifier_label") {
                settings.classifier_label = Some(v.clone());
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__BUCKET") {
        settings.bucket = v;
    }

    if let Some(v) = env("APP__MAX_UPLOAD_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_upload_bytes = parsed;
        }
    }

    if let Some(v) = env("APP__CLASSIFIER_LABEL") {
        settings.classifier_label = Some(v);
    }

    settings.classifier_label = settings
        .classifier_label
        .take()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty());

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        return sqlite_url_for_path(path);
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return sqlite_url_for_path(path);
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    sqlite_url_for_path(raw_database_url)
}

/// Drive-letter paths keep the single-colon form sqlx expects on Windows.
fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if has_windows_drive_prefix(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_windows_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
