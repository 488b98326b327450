//! Command-line interface for inspecting GitHub App credentials.
//!
//! - `token` - Print a freshly signed app JWT
//! - `installation <login>` - Resolve an installation and print its ID and token expiry

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use githubapp::config::FileConfig;
use githubapp::App;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "githubapp")]
#[command(author, version, about = "GitHub App token and installation client tool", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "githubapp.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// GitHub App ID (overrides app.app_id)
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<String>,

    /// PEM private key contents (overrides app.private_key)
    #[arg(long, env = "GITHUB_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// GitHub API base URL (overrides app.api_url)
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a signed app JWT
    Token,

    /// Resolve the installation for a user login
    Installation {
        /// GitHub user login
        login: String,
    },
}

impl Cli {
    /// Merge command-line overrides into the file configuration.
    pub fn apply_overrides(&self, file: &mut FileConfig) {
        if let Some(app_id) = &self.app_id {
            file.app.app_id = Some(app_id.clone());
        }
        if let Some(private_key) = &self.private_key {
            file.app.private_key = Some(private_key.clone());
        }
        if let Some(api_url) = &self.api_url {
            file.app.api_url = api_url.clone();
        }
    }
}

/// Run a CLI subcommand
pub async fn run(command: Commands, file: &FileConfig) -> Result<()> {
    let config = file.app.to_config()?;
    let app = App::new(config)
        .context("Failed to initialize GitHub App")?
        .with_boxed_cache(file.cache.build());

    match command {
        Commands::Token => {
            let token = app.token().await.context("Failed to sign app token")?;
            println!("{}", token.access_token);
        }
        Commands::Installation { login } => {
            let installation = app.installation(&login).await?;
            let token = installation.token().await?;
            println!("installation_id: {}", installation.id());
            println!("token_expires_at: {}", token.expiry.to_rfc3339());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installation_command() {
        let cli = Cli::try_parse_from([
            "githubapp",
            "--app-id",
            "1234",
            "--api-url",
            "https://ghe.example.com/api/v3",
            "installation",
            "octocat",
        ])
        .unwrap();

        let mut file = FileConfig::default();
        cli.apply_overrides(&mut file);

        assert_eq!(file.app.app_id.as_deref(), Some("1234"));
        assert_eq!(file.app.api_url, "https://ghe.example.com/api/v3");
        assert!(matches!(cli.command, Commands::Installation { ref login } if login == "octocat"));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["githubapp"]).is_err());
    }
}
