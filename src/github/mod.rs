//! GitHub App authentication.
//!
//! This module provides:
//! - App JWT generation and reuse ([`AppTokenSource`], [`ReuseTokenSource`])
//! - Installation access token exchange ([`InstallationTokenSource`])
//! - Authenticated HTTP and API clients ([`AuthClient`], [`GitHubClient`])
//! - The installation resolver ([`App`])

pub mod api_client;
pub mod app;
pub mod auth_client;
pub mod token_manager;

pub use api_client::{validate_login, validate_repo_name, AppInstallation, GitHubClient};
pub use app::{cache_key, App, Installation, InstallationCache};
pub use auth_client::AuthClient;
pub use token_manager::{
    effective_lifetime, AppTokenSource, InstallationTokenSource, ReuseTokenSource, Token,
    TokenSource, MAX_EXPIRES,
};
