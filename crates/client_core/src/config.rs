use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use shared::domain::{BucketName, DEFAULT_BUCKET};

pub const CLIENT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    pub bucket: String,
    pub request_timeout_secs: u64,
    pub fetch_attempts: u32,
    pub fetch_backoff_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3001".into(),
            bucket: DEFAULT_BUCKET.into(),
            request_timeout_secs: 30,
            fetch_attempts: 1,
            fetch_backoff_ms: 500,
        }
    }
}

impl ClientSettings {
    /// Defaults, then `client.toml` in the working directory when present,
    /// then `APP__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(
            Some(Path::new(CLIENT_CONFIG_FILE)),
            Environment::with_prefix("APP").separator("__"),
        )
    }

    pub fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn bucket_name(&self) -> BucketName {
        BucketName::new(self.bucket.trim())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_backoff(&self) -> Duration {
        Duration::from_millis(self.fetch_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("APP")
            .separator("__")
            .source(Some(vars))
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let settings = ClientSettings::from_sources(None, env(&[])).expect("settings");
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(settings.bucket_name().as_str(), "frubucket");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings =
            ClientSettings::from_sources(Some(&dir.path().join("client.toml")), env(&[]))
                .expect("settings");
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            "server_url = \"http://10.0.0.5:3001\"\nbucket = \"from-file\"\nfetch_attempts = 3\n",
        )
        .expect("write config");

        let settings = ClientSettings::from_sources(
            Some(&path),
            env(&[("APP__BUCKET", "from-env"), ("APP__FETCH_BACKOFF_MS", "25")]),
        )
        .expect("settings");

        assert_eq!(settings.server_url, "http://10.0.0.5:3001");
        assert_eq!(settings.bucket, "from-env");
        assert_eq!(settings.fetch_attempts, 3);
        assert_eq!(settings.fetch_backoff(), Duration::from_millis(25));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let settings = ClientSettings {
            request_timeout_secs: 0,
            ..ClientSettings::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }
}
