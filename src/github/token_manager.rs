//! Token sources for GitHub App authentication.
//!
//! GitHub Apps use two types of credentials:
//! 1. App JWT - short-lived JWT signed with the app's private key (app-level calls)
//! 2. Installation access token - exchanged with the app JWT for one installation
//!
//! Both are produced by a [`TokenSource`] and wrapped in a [`ReuseTokenSource`]
//! so a token is only regenerated once it is missing or about to expire.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::auth_client::{error_for_status, AuthClient};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

/// Maximum lifetime of an app JWT, as defined by GitHub.
pub const MAX_EXPIRES: Duration = Duration::from_secs(10 * 60);

/// A cached token is treated as stale this long before it actually expires.
const EXPIRY_DELTA_SECS: i64 = 10;

/// `iat` is backdated to absorb clock drift between us and GitHub.
const CLOCK_DRIFT_SECS: i64 = 60;

/// A bearer credential with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
}

impl Token {
    pub fn bearer(access_token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            expiry,
        }
    }

    /// Whether the token can still be handed out at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && now + chrono::Duration::seconds(EXPIRY_DELTA_SECS) < self.expiry
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Anything that can hand out bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token>;
}

/// JWT claims for GitHub App authentication.
#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration (Unix timestamp)
    exp: i64,
    /// Issuer - the GitHub App ID
    iss: String,
}

/// Clamp a requested lifetime into `(0, MAX_EXPIRES]`.
///
/// Anything missing, zero, or above the maximum becomes [`MAX_EXPIRES`].
pub fn effective_lifetime(requested: Option<Duration>) -> Duration {
    match requested {
        Some(lifetime) if !lifetime.is_zero() && lifetime <= MAX_EXPIRES => lifetime,
        _ => MAX_EXPIRES,
    }
}

/// Signs a fresh app JWT on every call.
///
/// The JWT is signed with RS256 and carries `iss = app_id`.
pub struct AppTokenSource {
    app_id: String,
    lifetime: Duration,
    key: EncodingKey,
    clock: Arc<dyn Clock>,
}

impl AppTokenSource {
    /// Parse the PEM private key and build the source.
    ///
    /// Fails with [`Error::InvalidPrivateKey`] right here when the key cannot
    /// sign, so a bad key never reaches the first `token()` call.
    pub fn new(
        app_id: impl Into<String>,
        private_key_pem: &[u8],
        lifetime: Option<Duration>,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem).map_err(Error::InvalidPrivateKey)?;
        // from_rsa_pem only checks the PEM envelope, so prove the key can sign.
        jsonwebtoken::crypto::sign(b"githubapp", &key, Algorithm::RS256)
            .map_err(Error::InvalidPrivateKey)?;

        Ok(Self {
            app_id: app_id.into(),
            lifetime: effective_lifetime(lifetime),
            key,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The lifetime each generated token gets.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a new app JWT.
    pub fn generate(&self) -> Result<Token> {
        let now = self.clock.now();
        // lifetime is clamped to MAX_EXPIRES, so the conversion cannot overflow
        let lifetime = chrono::Duration::from_std(self.lifetime)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        let expiry = now + lifetime;

        let claims = AppClaims {
            iat: now.timestamp() - CLOCK_DRIFT_SECS,
            exp: expiry.timestamp(),
            iss: self.app_id.clone(),
        };

        let header = Header::new(Algorithm::RS256);
        let jwt = encode(&header, &claims, &self.key).map_err(Error::Signing)?;

        debug!(app_id = %self.app_id, expiry = %expiry, "Signed app JWT");
        Ok(Token::bearer(jwt, expiry))
    }
}

#[async_trait]
impl TokenSource for AppTokenSource {
    async fn token(&self) -> Result<Token> {
        self.generate()
    }
}

/// Hands out the last token until it goes stale, then asks `inner` for a new one.
///
/// Concurrent callers share one refresh: the lock is held while `inner` runs.
pub struct ReuseTokenSource<S> {
    inner: S,
    current: Mutex<Option<Token>>,
    clock: Arc<dyn Clock>,
}

impl<S: TokenSource> ReuseTokenSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            current: Mutex::new(None),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for ReuseTokenSource<S> {
    async fn token(&self) -> Result<Token> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                trace!(expiry = %token.expiry, "Reusing cached token");
                return Ok(token.clone());
            }
        }

        let token = self.inner.token().await?;
        *current = Some(token.clone());
        Ok(token)
    }
}

/// Response from GitHub's installation access token endpoint.
#[derive(Debug, Deserialize)]
pub struct InstallationTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub permissions: serde_json::Value,
    pub repository_selection: Option<String>,
}

/// Exchanges the app JWT for an installation access token.
///
/// `app` must be authenticated with the app JWT source. Every call performs
/// one exchange; wrap it in a [`ReuseTokenSource`] to keep tokens until expiry.
pub struct InstallationTokenSource {
    app: AuthClient,
    installation_id: u64,
}

impl InstallationTokenSource {
    pub fn new(app: AuthClient, installation_id: u64) -> Self {
        Self {
            app,
            installation_id,
        }
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// Request a new installation access token from GitHub.
    pub async fn exchange(&self) -> Result<InstallationTokenResponse> {
        let path = format!("/app/installations/{}/access_tokens", self.installation_id);
        let response = self.app.request(Method::POST, &path).await?.send().await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenSource for InstallationTokenSource {
    async fn token(&self) -> Result<Token> {
        let response = self.exchange().await?;
        debug!(
            installation_id = self.installation_id,
            expiry = %response.expires_at,
            "Exchanged installation access token"
        );
        Ok(Token::bearer(response.token, response.expires_at))
    }
}
