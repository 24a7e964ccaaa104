use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_POLL_SECS: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;
/// Application directory under the platform's local data dir.
pub const APP_DIR_NAME: &str = "posta";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Always ends in `/`, so endpoint paths join beneath it.
    pub api_base_url: Url,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Honour HTTP(S)_PROXY from the environment.
    pub use_system_proxy: bool,
}

impl ClientConfig {
    /// Defaults pointed at `base_url`, with no proxy. Used for local servers.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(base_url)?,
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            data_dir: default_data_dir(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            use_system_proxy: false,
        })
    }

    /// Reads `.env` (if there is one) and then the `POSTA_*` variables.
    pub fn from_env() -> ClientResult<Self> {
        // A client without a .env file is normal.
        dotenvy::dotenv().ok();

        let base_url = env_non_empty("POSTA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&base_url)?;
        config.use_system_proxy = true;

        if let Some(raw) = env_non_empty("POSTA_POLL_SECS") {
            config.poll_interval = Duration::from_secs(parse_positive("POSTA_POLL_SECS", &raw)?);
        }
        if let Some(raw) = env_non_empty("POSTA_HTTP_TIMEOUT_MS") {
            config.http_timeout =
                Duration::from_millis(parse_positive("POSTA_HTTP_TIMEOUT_MS", &raw)?);
        }
        if let Some(dir) = env_non_empty("POSTA_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_non_empty("POSTA_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

/// Per-user location of the stored token, independent of the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed)
        .map_err(|e| ClientError::Config(format!("base url '{}': {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ClientError::Config(format!(
            "base url '{}' must be http:// or https:// with a host",
            trimmed
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn parse_positive(key: &str, raw: &str) -> ClientResult<u64> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ClientError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url(" http://localhost:8080 ").unwrap().as_str(),
            "http://localhost:8080/"
        );
        assert_eq!(
            normalize_base_url("https://mail.example.com/posta").unwrap().as_str(),
            "https://mail.example.com/posta/"
        );
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("localhost:8080").is_err());
        assert!(normalize_base_url("ftp://host").is_err());
        assert!(normalize_base_url("mailto:admin@example.com").is_err());
    }

    #[test]
    fn malformed_base_urls_fail_as_config_errors() {
        for raw in [
            "http://exa mple.com",
            "http://host:99999",
            "http://[::1",
            "https://a b/c",
        ] {
            assert!(
                matches!(normalize_base_url(raw), Err(ClientError::Config(_))),
                "{} was accepted",
                raw
            );
        }
    }

    #[test]
    fn token_dir_does_not_depend_on_the_working_directory() {
        let config = ClientConfig::new(DEFAULT_API_URL).unwrap();
        assert!(config.data_dir.ends_with(APP_DIR_NAME));
        if dirs::data_local_dir().is_some() {
            assert!(config.data_dir.is_absolute());
        }
    }

    #[test]
    fn default_poll_interval_is_ten_seconds() {
        let config = ClientConfig::new(DEFAULT_API_URL).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(!config.use_system_proxy);
    }

    #[test]
    fn positive_integers_only() {
        assert_eq!(parse_positive("X", "10").unwrap(), 10);
        assert!(parse_positive("X", "0").is_err());
        assert!(parse_positive("X", "ten").is_err());
    }
}
