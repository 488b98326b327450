//! GitHub API client for app-level and installation-level operations.
//!
//! The same client type serves both credentials: bound to the app JWT it can
//! discover installations, bound to an installation token it can work with
//! the repositories that installation grants access to.

use serde::{Deserialize, Serialize};

use super::auth_client::AuthClient;
use crate::error::{Error, Result};

const MAX_LOGIN_LEN: usize = 39;

/// Check that `login` is a GitHub user or organization login.
///
/// Logins are ASCII letters, digits, `-` and `_` (enterprise managed users),
/// so they can be placed in a URL path verbatim.
pub fn validate_login(login: &str) -> Result<()> {
    let valid = !login.is_empty()
        && login.len() <= MAX_LOGIN_LEN
        && login
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind: "login",
            value: login.to_string(),
        })
    }
}

/// Check that `name` is a repository name usable as one URL path segment.
pub fn validate_repo_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind: "repository name",
            value: name.to_string(),
        })
    }
}

/// GitHub REST client over an [`AuthClient`].
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: AuthClient,
}

impl GitHubClient {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// The authenticated HTTP client this API client sends through.
    pub fn auth_client(&self) -> &AuthClient {
        &self.client
    }

    /// Find the app's installation on a user account.
    /// Requires app JWT authentication.
    pub async fn find_user_installation(&self, login: &str) -> Result<AppInstallation> {
        validate_login(login)?;
        self.client.get(&format!("/users/{}/installation", login)).await
    }

    /// Find the app's installation on an organization.
    /// Requires app JWT authentication.
    pub async fn find_org_installation(&self, org: &str) -> Result<AppInstallation> {
        validate_login(org)?;
        self.client.get(&format!("/orgs/{}/installation", org)).await
    }

    /// List installations for the authenticated app.
    /// Requires app JWT authentication.
    pub async fn list_installations(&self) -> Result<Vec<AppInstallation>> {
        self.client.get("/app/installations").await
    }

    /// Get the authenticated app's information.
    pub async fn get_app_info(&self) -> Result<AppInfo> {
        self.client.get("/app").await
    }

    /// List repositories accessible to an installation.
    /// Requires an installation token.
    pub async fn list_repos(&self, per_page: u32, page: u32) -> Result<Vec<Repository>> {
        let path = format!(
            "/installation/repositories?per_page={}&page={}",
            per_page, page
        );

        let response: ListReposResponse = self.client.get(&path).await?;
        Ok(response.repositories)
    }

    /// List all repositories (paginated, fetching all pages).
    pub async fn list_all_repos(&self) -> Result<Vec<Repository>> {
        let mut all_repos = Vec::new();
        let mut page = 1;
        let per_page = 100;

        loop {
            let repos = self.list_repos(per_page, page).await?;
            let last_page = repos.len() < per_page as usize;
            all_repos.extend(repos);
            if last_page {
                break;
            }
            page += 1;
        }

        Ok(all_repos)
    }

    /// List branches for a repository.
    pub async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        validate_login(owner)?;
        validate_repo_name(repo)?;
        let path = format!("/repos/{}/{}/branches?per_page=100", owner, repo);
        self.client.get(&path).await
    }

    /// Post a comment on an issue or pull request.
    ///
    /// # Returns
    /// The comment ID
    pub async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<u64> {
        validate_login(owner)?;
        validate_repo_name(repo)?;
        let path = format!("/repos/{}/{}/issues/{}/comments", owner, repo, issue_number);

        let request_body = CreateCommentRequest {
            body: body.to_string(),
        };

        let response: CommentResponse = self.client.post(&path, &request_body).await?;
        Ok(response.id)
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct ListReposResponse {
    #[allow(dead_code)]
    total_count: u64,
    repositories: Vec<Repository>,
}

/// A GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub clone_url: Option<String>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// A Git branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(rename = "protected", default)]
    pub is_protected: bool,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest {
    body: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
}

/// GitHub App information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub id: u64,
    pub slug: Option<String>,
    pub name: String,
    pub owner: Option<Account>,
    pub description: Option<String>,
    pub html_url: Option<String>,
}

/// A user or organization account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

/// An installation record as returned by the app-level API.
///
/// Only `id` is guaranteed; the rest is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInstallation {
    pub id: u64,
    pub account: Option<Account>,
    pub app_id: Option<u64>,
    pub target_type: Option<String>,
    pub repository_selection: Option<String>,
    pub access_tokens_url: Option<String>,
    #[serde(default)]
    pub permissions: serde_json::Value,
    #[serde(default)]
    pub events: Vec<String>,
    pub suspended_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::token_manager::{Token, TokenSource};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticSource;

    #[async_trait]
    impl TokenSource for StaticSource {
        async fn token(&self) -> Result<Token> {
            Ok(Token::bearer("ghs_test", Utc::now() + chrono::Duration::hours(1)))
        }
    }

    fn github(server: &MockServer) -> GitHubClient {
        GitHubClient::new(AuthClient::new(
            reqwest::Client::new(),
            server.uri(),
            "githubapp-test",
            Arc::new(StaticSource),
        ))
    }

    fn repo_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("repo-{}", id),
            "full_name": format!("octo/repo-{}", id),
            "description": null,
            "private": false
        })
    }

    #[tokio::test]
    async fn test_find_user_installation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/installation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "account": {"login": "octocat", "id": 1, "type": "User"},
                "app_id": 1234,
                "events": ["push"]
            })))
            .mount(&server)
            .await;

        let installation = github(&server).find_user_installation("octocat").await.unwrap();
        assert_eq!(installation.id, 42);
        assert_eq!(installation.account.unwrap().login, "octocat");
        assert_eq!(installation.events, vec!["push".to_string()]);
    }

    #[tokio::test]
    async fn test_find_org_installation_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/nobody/installation"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Not Found"
            })))
            .mount(&server)
            .await;

        let err = github(&server).find_org_installation("nobody").await.unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_all_repos_walks_pages() {
        let server = MockServer::start().await;
        let first_page: Vec<_> = (1..=100).map(repo_json).collect();
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 101,
                "repositories": first_page
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 101,
                "repositories": [repo_json(101)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repos = github(&server).list_all_repos().await.unwrap();
        assert_eq!(repos.len(), 101);
        assert_eq!(repos[100].full_name, "octo/repo-101");
    }

    #[tokio::test]
    async fn test_post_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/hello/issues/7/comments"))
            .and(body_json(serde_json::json!({"body": "Deployed"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 99})))
            .mount(&server)
            .await;

        let id = github(&server)
            .post_comment("octo", "hello", 7, "Deployed")
            .await
            .unwrap();
        assert_eq!(id, 99);
    }

    #[test]
    fn test_validate_login() {
        let longest = "x".repeat(39);
        let too_long = "x".repeat(40);

        for login in ["octocat", "octo-org", "a", "jdoe_acme", longest.as_str()] {
            assert!(validate_login(login).is_ok(), "{:?} should be valid", login);
        }
        for login in ["", "bob/../alice", "alice?page=2", "al ice", "alice%2F", too_long.as_str()] {
            assert!(validate_login(login).is_err(), "{:?} should be rejected", login);
        }
    }

    #[test]
    fn test_validate_repo_name() {
        for name in ["hello", "hello-world", "hello.rs", "_private", ".github"] {
            assert!(validate_repo_name(name).is_ok(), "{:?} should be valid", name);
        }
        for name in ["", ".", "..", "a/b", "a?b", "a#b"] {
            assert!(validate_repo_name(name).is_err(), "{:?} should be rejected", name);
        }
    }

    #[tokio::test]
    async fn test_list_installations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "account": {"login": "octocat", "id": 10, "type": "User"}},
                {"id": 2, "account": {"login": "octo-org", "id": 20, "type": "Organization"},
                 "suspended_at": "2024-01-01T00:00:00Z"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let installations = github(&server).list_installations().await.unwrap();
        assert_eq!(installations.len(), 2);
        assert_eq!(installations[0].id, 1);
        let org = installations[1].account.as_ref().unwrap();
        assert_eq!(org.account_type.as_deref(), Some("Organization"));
        assert!(installations[1].suspended_at.is_some());
    }

    #[tokio::test]
    async fn test_get_app_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1234,
                "slug": "deploy-bot",
                "name": "Deploy Bot",
                "owner": {"login": "octo-org", "id": 20, "type": "Organization"},
                "description": null,
                "html_url": "https://github.com/apps/deploy-bot"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = github(&server).get_app_info().await.unwrap();
        assert_eq!(app.id, 1234);
        assert_eq!(app.slug.as_deref(), Some("deploy-bot"));
        assert_eq!(app.owner.unwrap().login, "octo-org");
    }

    #[tokio::test]
    async fn test_list_branches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/hello/branches"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "main", "protected": true, "commit": {"sha": "abc123", "url": null}},
                {"name": "feature", "commit": {"sha": "def456"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let branches = github(&server).list_branches("octo", "hello").await.unwrap();
        assert_eq!(branches.len(), 2);
        assert!(branches[0].is_protected);
        assert_eq!(branches[0].commit.sha, "abc123");
        assert!(!branches[1].is_protected);
        assert!(branches[1].commit.url.is_none());
    }

    #[tokio::test]
    async fn test_repo_path_segments_are_validated() {
        let server = MockServer::start().await;
        let client = github(&server);

        let err = client.list_branches("octo", "../../app").await.unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "repository name", .. }));
        let err = client.post_comment("octo/x", "hello", 1, "hi").await.unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "login", .. }));

        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
