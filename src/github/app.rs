//! Application client and installation resolver.
//!
//! [`App`] authenticates as the GitHub App itself and resolves account logins
//! to [`Installation`]s, each carrying its own installation-scoped client.
//!
//! # Cache discipline
//!
//! The optional cache sits behind one `RwLock`. A lookup holds the read guard
//! only around `get`, a store holds the write guard only around `set`, and no
//! guard is held across network I/O. Two concurrent misses for the same login
//! therefore both mint an installation and the later store wins; both callers
//! still receive a complete `Installation`.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::api_client::{validate_login, GitHubClient};
use super::auth_client::AuthClient;
use super::token_manager::{
    AppTokenSource, InstallationTokenSource, ReuseTokenSource, Token, TokenSource,
};
use crate::cache::{Cache, NoCache};
use crate::config::Config;
use crate::error::{Error, Result};

/// Prefix for installation entries in the cache.
pub const CACHE_KEY_PREFIX: &str = "installation/";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache key under which the installation for `login` is stored.
pub fn cache_key(login: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, login)
}

/// Cache holding resolved installations.
pub type InstallationCache = Box<dyn Cache<Arc<Installation>>>;

/// An installation with clients authenticated by its own access token.
///
/// Immutable once built; share it freely through the `Arc` the resolver hands out.
#[derive(Debug)]
pub struct Installation {
    client: AuthClient,
    github: GitHubClient,
    id: u64,
}

impl Installation {
    /// HTTP client authenticated with the installation token.
    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// GitHub API client on top of [`client`](Self::client).
    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current installation access token, renewed when stale.
    pub async fn token(&self) -> Result<Token> {
        self.client.token().await
    }
}

/// A GitHub App that can produce installation clients.
pub struct App {
    github: GitHubClient,
    config: Config,
    http: reqwest::Client,
    cache: RwLock<InstallationCache>,
}

impl App {
    /// Build the app client.
    ///
    /// Fails immediately with [`Error::InvalidPrivateKey`] when the configured
    /// key cannot sign. No cache is configured; see [`with_cache`](Self::with_cache).
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let github = GitHubClient::new(config.client(http.clone())?);

        Ok(Self {
            github,
            config,
            http,
            cache: RwLock::new(Box::new(NoCache)),
        })
    }

    /// Keep resolved installations in `cache`.
    pub fn with_cache(mut self, cache: impl Cache<Arc<Installation>> + 'static) -> Self {
        self.cache = RwLock::new(Box::new(cache));
        self
    }

    /// Same as [`with_cache`](Self::with_cache) for an already boxed cache.
    pub fn with_boxed_cache(mut self, cache: InstallationCache) -> Self {
        self.cache = RwLock::new(cache);
        self
    }

    /// Send all requests through `http`, including installation clients
    /// created afterwards.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Result<Self> {
        self.github = GitHubClient::new(self.config.client(http.clone())?);
        self.http = http;
        Ok(self)
    }

    /// GitHub API client authenticated as the app.
    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current app JWT.
    pub async fn token(&self) -> Result<Token> {
        self.github.auth_client().token().await
    }

    /// Installation for `login` if the cache currently holds one.
    pub fn cached(&self, login: &str) -> Option<Arc<Installation>> {
        self.cache.read().get(&cache_key(login))
    }

    /// Resolve the installation for a user login.
    ///
    /// Logins that are not valid GitHub logins fail with
    /// [`Error::InvalidName`] before the cache is consulted. A cache hit
    /// returns the stored `Arc` without any network call. On a
    /// miss the installation is looked up with the app JWT, an installation
    /// token is exchanged, and the result is cached. Dropping the future
    /// cancels whichever request is in flight.
    pub async fn installation(&self, login: &str) -> Result<Arc<Installation>> {
        validate_login(login)?;
        let key = cache_key(login);

        let cached = self.cache.read().get(&key);
        if let Some(installation) = cached {
            debug!(login, installation_id = installation.id(), "Installation cache hit");
            return Ok(installation);
        }
        debug!(login, "Installation cache miss");

        let record = self
            .github
            .find_user_installation(login)
            .await
            .map_err(|e| Error::InstallationLookup {
                login: login.to_string(),
                source: Box::new(e),
            })?;

        let installation = Arc::new(self.installation_for_id(record.id).await?);

        self.cache.write().set(&key, Arc::clone(&installation));
        debug!(login, installation_id = installation.id(), "Installation cached");

        Ok(installation)
    }

    /// Build an installation client for a known installation ID.
    ///
    /// The first access token is exchanged eagerly so a failed exchange
    /// surfaces here as [`Error::TransportExchange`]; later tokens are renewed
    /// lazily by the installation's own client. The cache is not consulted.
    pub async fn installation_for_id(&self, installation_id: u64) -> Result<Installation> {
        let exchange =
            InstallationTokenSource::new(self.github.auth_client().clone(), installation_id);
        let tokens: Arc<dyn TokenSource> = Arc::new(ReuseTokenSource::new(exchange));

        tokens
            .token()
            .await
            .map_err(|e| Error::TransportExchange {
                installation_id,
                source: Box::new(e),
            })?;

        let client = AuthClient::new(
            self.http.clone(),
            &self.config.api_url,
            &self.config.user_agent,
            tokens,
        );

        Ok(Installation {
            github: GitHubClient::new(client.clone()),
            client,
            id: installation_id,
        })
    }
}

impl Config {
    /// App JWT source that reuses each token until it goes stale.
    ///
    /// Fails with [`Error::InvalidPrivateKey`] when the key cannot sign.
    pub fn token_source(&self) -> Result<ReuseTokenSource<AppTokenSource>> {
        let source = AppTokenSource::new(self.app_id.as_str(), &self.private_key, self.expire)?;
        Ok(ReuseTokenSource::new(source))
    }

    /// HTTP client authenticated with the app JWT.
    pub fn client(&self, http: reqwest::Client) -> Result<AuthClient> {
        let tokens: Arc<dyn TokenSource> = Arc::new(self.token_source()?);
        Ok(AuthClient::new(http, &self.api_url, &self.user_agent, tokens))
    }
}
