//! GitHub App authentication clients.
//!
//! A GitHub App authenticates as itself with a short-lived JWT and on behalf
//! of each installation with an installation access token. This crate issues
//! both and hands out ready-to-use clients:
//!
//! ```no_run
//! # async fn example() -> githubapp::Result<()> {
//! use githubapp::{App, Config, ExpiringCache};
//!
//! let pem = std::env::var("GITHUB_PRIVATE_KEY").unwrap_or_default();
//! let app = App::new(Config::new("1234", pem))?.with_cache(ExpiringCache::new(None));
//!
//! let installation = app.installation("octocat").await?;
//! let repos = installation.github().list_all_repos().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;

#[cfg(test)]
mod testutil;

pub use cache::{Cache, ExpiringCache, NoCache};
pub use config::Config;
pub use error::{Error, Result};
pub use github::{App, AuthClient, GitHubClient, Installation, Token, TokenSource};
