use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Per-request timeout for page and caption fetches
    pub request_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    pub accept_language: String,
    /// Timed-text format requested from the caption endpoint
    pub caption_format: String,
    /// Language prefix preferred when choosing a caption track
    pub preferred_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            pool_idle_timeout_secs: 30,
            pool_max_idle_per_host: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            caption_format: "srv1".to_string(),
            preferred_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load config from ~/.config/ytingest/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytingest")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
request_timeout_secs = 10
pool_max_idle_per_host = 4
caption_format = "srv3"
preferred_language = "es"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert_eq!(config.caption_format, "srv3");
        assert_eq!(config.preferred_language, "es");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.caption_format, "srv1");
        assert_eq!(config.preferred_language, "en");
    }

    #[test]
    fn test_parse_bad_type_fails() {
        assert!(toml::from_str::<Config>(r#"request_timeout_secs = "soon""#).is_err());
    }
}
