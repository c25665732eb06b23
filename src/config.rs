//! Runtime configuration: env vars first, optional TOML file as fallback.

use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_FEED_URL: &str = "https://status.openai.com/feed.rss";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

const ENV_FEED_URL: &str = "FEED_URL";
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
const ENV_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";
const CONFIG_PATH: &str = "config/statuswatch.toml";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub feed_url: String,
    pub interval_secs: u64,
    pub webhook_url: Option<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            webhook_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    feed_url: Option<String>,
    poll_interval_secs: Option<u64>,
    notify_webhook_url: Option<String>,
}

fn load_file(path: &Path) -> FileConfig {
    let Ok(content) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "ignoring malformed config file");
            FileConfig::default()
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PollerConfig {
    /// Resolution order per field: env var, then `config/statuswatch.toml`,
    /// then the built-in default. Unparseable values fall back with a warn
    /// rather than aborting startup.
    pub fn from_env() -> Self {
        Self::from_env_and_file(Path::new(CONFIG_PATH))
    }

    fn from_env_and_file(path: &Path) -> Self {
        let file = load_file(path);

        let interval_secs = match env_nonempty(ENV_POLL_INTERVAL) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(v) if v > 0 => v,
                _ => {
                    tracing::warn!(raw, "invalid POLL_INTERVAL_SECS, using default");
                    file.poll_interval_secs
                        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
                }
            },
            None => file
                .poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };

        Self {
            feed_url: env_nonempty(ENV_FEED_URL)
                .or(file.feed_url)
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            interval_secs,
            webhook_url: env_nonempty(ENV_WEBHOOK_URL).or(file.notify_webhook_url),
        }
    }
}
