use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cache::{ExpiringCache, NoCache};
use crate::error::Error;
use crate::github::InstallationCache;

/// Default GitHub API endpoint. GitHub Enterprise uses `https://<host>/api/v3`.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Identity of a GitHub App.
///
/// The private key is the PEM content downloaded from the app settings,
/// usually read from an environment variable:
///
/// ```text
/// export GITHUB_PRIVATE_KEY="$(cat private_key.pem)"
/// ```
#[derive(Clone)]
pub struct Config {
    /// Application ID from the GitHub App settings
    pub app_id: String,
    /// PEM-encoded RSA private key
    pub private_key: Vec<u8>,
    /// Requested app JWT lifetime; `None` or anything above 10 minutes means 10 minutes
    pub expire: Option<Duration>,
    /// Base URL of the REST API
    pub api_url: String,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Config {
    pub fn new(app_id: impl Into<String>, private_key: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id: app_id.into(),
            private_key: private_key.into(),
            expire: None,
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Read `GITHUB_APP_ID`, `GITHUB_PRIVATE_KEY` and the optional `GITHUB_API_URL`.
    pub fn from_env() -> std::result::Result<Self, Error> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables read through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> std::result::Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", name)))
        };

        let mut config = Config::new(required("GITHUB_APP_ID")?, required("GITHUB_PRIVATE_KEY")?);
        if let Some(api_url) = lookup("GITHUB_API_URL").filter(|url| !url.is_empty()) {
            config.api_url = api_url;
        }
        Ok(config)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("private_key", &"<redacted>")
            .field("expire", &self.expire)
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("githubapp/{}", env!("CARGO_PKG_VERSION"))
}

/// On-disk configuration (`githubapp.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub app_id: Option<String>,
    /// Inline PEM content; takes precedence over `private_key_path`
    pub private_key: Option<String>,
    pub private_key_path: Option<PathBuf>,
    /// App JWT lifetime in seconds (clamped to 600)
    pub expire_secs: Option<u64>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            private_key_path: None,
            expire_secs: None,
            api_url: default_api_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("expire_secs", &self.expire_secs)
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl AppConfig {
    /// Resolve into a [`Config`], reading the key file if needed.
    pub fn to_config(&self) -> Result<Config> {
        let app_id = self
            .app_id
            .clone()
            .context("app.app_id is not configured")?;

        let private_key = match (&self.private_key, &self.private_key_path) {
            (Some(pem), _) => pem.clone().into_bytes(),
            (None, Some(path)) => std::fs::read(path)
                .with_context(|| format!("Failed to read private key: {}", path.display()))?,
            (None, None) => anyhow::bail!("app.private_key or app.private_key_path is required"),
        };

        Ok(Config {
            app_id,
            private_key,
            expire: self.expire_secs.map(Duration::from_secs),
            api_url: self.api_url.clone(),
            user_agent: self.user_agent.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Cache resolved installations in memory
    #[serde(default)]
    pub enabled: bool,
    /// How long an installation stays cached; absent keeps it until restart
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Build the installation cache this section describes.
    pub fn build(&self) -> InstallationCache {
        if self.enabled {
            Box::new(ExpiringCache::new(self.ttl_secs.map(Duration::from_secs)))
        } else {
            Box::new(NoCache)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: FileConfig = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            debug!("No config file found, using defaults");
            Ok(FileConfig::default())
        }
    }
}
