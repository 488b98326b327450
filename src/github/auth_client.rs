//! HTTP client that authenticates every request with a bearer token.

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::token_manager::{Token, TokenSource};
use crate::error::{Error, Result};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// `reqwest::Client` bound to a base URL and a [`TokenSource`].
///
/// Cloning is cheap and clones share the token source, so a token refreshed
/// through one clone is reused by all of them.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    tokens: Arc<dyn TokenSource>,
}

impl AuthClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            user_agent: user_agent.into(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Current token from the underlying source, refreshed if stale.
    pub async fn token(&self) -> Result<Token> {
        self.tokens.token().await
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Start a request carrying the GitHub headers and a fresh bearer token.
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.token().await?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(AUTHORIZATION, token.authorization())
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, &self.user_agent)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION))
    }

    /// Make an authenticated GET request and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).await?.send().await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// Make an authenticated POST request with a JSON body.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, path)
            .await?
            .json(body)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// Turn a non-2xx response into [`Error::Api`], keeping the body for context.
pub(crate) async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Api { status, body })
}
