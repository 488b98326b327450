//! Error types for GitHub App authentication.
//!
//! Every runtime failure is returned to the caller with context attached.
//! Nothing here is retried or logged.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced while issuing tokens or resolving installations
#[derive(Error, Debug)]
pub enum Error {
    /// The configured private key is not a usable RSA signing key.
    /// Raised when a token source is built, never on first use.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),

    #[error("failed signing app token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("failed getting user installation: {source}")]
    InstallationLookup {
        login: String,
        #[source]
        source: Box<Error>,
    },

    #[error("get install transport: {source}")]
    TransportExchange {
        installation_id: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {status} - {body}")]
    Api { status: StatusCode, body: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An account login or repository name that cannot be a single URL path segment.
    #[error("invalid GitHub {kind}: {value:?}")]
    InvalidName { kind: &'static str, value: String },
}

impl Error {
    /// Whether this error (or the error it wraps) is a 404 from GitHub.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status == StatusCode::NOT_FOUND,
            Error::InstallationLookup { source, .. } | Error::TransportExchange { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
