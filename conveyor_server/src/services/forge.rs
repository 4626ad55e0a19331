//! Forge integration — webhook validation, project handles, commit statuses.
//!
//! One HTTP client speaks the three forge dialects (GitHub, GitLab, Pagure);
//! checkers only ever see the [`GitProject`] trait.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("forge request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("forge API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unsupported project URL: {0}")]
    UnsupportedUrl(String),
}

/// Validate a GitHub webhook signature (X-Hub-Signature-256).
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Webhook secret not configured, skipping validation");
        return true;
    }

    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let sig_bytes = match hex::decode(sig) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// A forge issue, as much of it as checkers need.
#[derive(Debug, Clone)]
pub struct Issue {
    pub id: i64,
    pub title: String,
}

/// Resolved handle to one forge repository.
#[async_trait]
pub trait GitProject: Send + Sync {
    fn namespace(&self) -> &str;
    fn repo(&self) -> &str;

    async fn default_branch(&self) -> Result<String, ForgeError>;
    async fn has_write_access(&self, user: &str) -> Result<bool, ForgeError>;
    async fn can_merge_pr(&self, user: &str) -> Result<bool, ForgeError>;
    async fn pr_head_commit(&self, pr_id: i64) -> Result<String, ForgeError>;
    async fn get_issue(&self, id: i64) -> Result<Issue, ForgeError>;
    async fn search_issue_by_title(&self, title: &str) -> Result<Option<Issue>, ForgeError>;
    async fn create_issue(&self, title: &str, body: &str) -> Result<Issue, ForgeError>;
    async fn comment_issue(&self, id: i64, body: &str) -> Result<(), ForgeError>;
    async fn comment_pr(&self, pr_id: i64, body: &str) -> Result<(), ForgeError>;
    async fn set_commit_status(
        &self,
        sha: &str,
        state: &str,
        description: &str,
        context: &str,
    ) -> Result<(), ForgeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeFlavor {
    Github,
    Gitlab,
    Pagure,
}

/// Per-flavor API endpoints and tokens.
#[derive(Clone)]
pub struct ForgeClients {
    pub github_api_url: String,
    pub github_token: String,
    pub gitlab_api_url: String,
    pub gitlab_token: String,
    pub pagure_api_url: String,
    pub pagure_token: String,
    client: reqwest::Client,
}

impl ForgeClients {
    pub fn new(config: &crate::config::ServiceConfig) -> Self {
        Self {
            github_api_url: config.github_api_url.clone(),
            github_token: config.github_token.clone(),
            gitlab_api_url: config.gitlab_api_url.clone(),
            gitlab_token: config.gitlab_token.clone(),
            pagure_api_url: config.pagure_api_url.clone(),
            pagure_token: config.pagure_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Resolve a project URL into a flavor-aware project handle.
    pub fn project(&self, project_url: &str) -> Result<HttpProject, ForgeError> {
        let (host, namespace, repo) = split_project_url(project_url)
            .ok_or_else(|| ForgeError::UnsupportedUrl(project_url.to_string()))?;

        let (flavor, api_url, token) = if host.contains("gitlab") {
            (
                ForgeFlavor::Gitlab,
                self.gitlab_api_url.clone(),
                self.gitlab_token.clone(),
            )
        } else if host == "src.fedoraproject.org" || host.contains("pagure") {
            (
                ForgeFlavor::Pagure,
                self.pagure_api_url.clone(),
                self.pagure_token.clone(),
            )
        } else {
            (
                ForgeFlavor::Github,
                self.github_api_url.clone(),
                self.github_token.clone(),
            )
        };

        Ok(HttpProject {
            flavor,
            api_url,
            token,
            namespace,
            repo,
            client: self.client.clone(),
        })
    }
}

/// Split a project URL into (host, namespace, repo).
///
/// The namespace may hold several segments (GitLab subgroups, Pagure
/// "rpms/..." namespaces).
pub fn split_project_url(project_url: &str) -> Option<(String, String, String)> {
    let rest = project_url
        .strip_prefix("https://")
        .or_else(|| project_url.strip_prefix("http://"))?;
    let mut segments = rest.trim_end_matches('/').split('/');
    let host = segments.next()?.to_string();
    let parts: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    if parts.len() < 2 {
        return None;
    }
    let repo = parts[parts.len() - 1].trim_end_matches(".git").to_string();
    let namespace = parts[..parts.len() - 1].join("/");
    Some((host, namespace, repo))
}

/// HTTP-backed [`GitProject`].
#[derive(Clone)]
pub struct HttpProject {
    pub flavor: ForgeFlavor,
    api_url: String,
    token: String,
    namespace: String,
    repo: String,
    client: reqwest::Client,
}

impl HttpProject {
    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            return req;
        }
        match self.flavor {
            ForgeFlavor::Github => req
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json"),
            ForgeFlavor::Gitlab => req.header("PRIVATE-TOKEN", self.token.clone()),
            ForgeFlavor::Pagure => req.header("Authorization", format!("token {}", self.token)),
        }
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ForgeError> {
        let resp = self
            .auth(self.client.get(url))
            .header("User-Agent", "conveyor")
            .send()
            .await?;
        check_response(resp).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ForgeError> {
        let resp = self
            .auth(self.client.post(url))
            .header("User-Agent", "conveyor")
            .json(body)
            .send()
            .await?;
        check_response(resp).await
    }

    fn repo_path(&self) -> String {
        match self.flavor {
            ForgeFlavor::Github => format!("repos/{}/{}", self.namespace, self.repo),
            // GitLab addresses projects by URL-encoded full path.
            ForgeFlavor::Gitlab => format!(
                "projects/{}%2F{}",
                self.namespace.replace('/', "%2F"),
                self.repo
            ),
            ForgeFlavor::Pagure => format!("0/{}/{}", self.namespace, self.repo),
        }
    }
}

async fn check_response(resp: reqwest::Response) -> Result<serde_json::Value, ForgeError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ForgeError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

#[async_trait]
impl GitProject for HttpProject {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    async fn default_branch(&self) -> Result<String, ForgeError> {
        let url = format!("{}/{}", self.api_url, self.repo_path());
        let info = self.get_json(&url).await?;
        Ok(info["default_branch"]
            .as_str()
            .unwrap_or("main")
            .to_string())
    }

    async fn has_write_access(&self, user: &str) -> Result<bool, ForgeError> {
        match self.flavor {
            ForgeFlavor::Github => {
                let url = format!(
                    "{}/{}/collaborators/{}/permission",
                    self.api_url,
                    self.repo_path(),
                    user
                );
                let info = self.get_json(&url).await?;
                Ok(matches!(
                    info["permission"].as_str().unwrap_or_default(),
                    "admin" | "maintain" | "write"
                ))
            }
            ForgeFlavor::Gitlab => {
                let url = format!("{}/{}/members/all", self.api_url, self.repo_path());
                let members = self.get_json(&url).await?;
                Ok(members
                    .as_array()
                    .map(|members| {
                        members.iter().any(|m| {
                            m["username"].as_str() == Some(user)
                                && m["access_level"].as_i64().unwrap_or(0) >= 30
                        })
                    })
                    .unwrap_or(false))
            }
            ForgeFlavor::Pagure => {
                let url = format!("{}/{}", self.api_url, self.repo_path());
                let info = self.get_json(&url).await?;
                let users = &info["access_users"];
                for role in ["owner", "admin", "committer"] {
                    if users[role]
                        .as_array()
                        .is_some_and(|list| list.iter().any(|u| u.as_str() == Some(user)))
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    async fn can_merge_pr(&self, user: &str) -> Result<bool, ForgeError> {
        // Merge rights and write access coincide on all three forges.
        self.has_write_access(user).await
    }

    async fn pr_head_commit(&self, pr_id: i64) -> Result<String, ForgeError> {
        let (url, pointer) = match self.flavor {
            ForgeFlavor::Github => (
                format!("{}/{}/pulls/{}", self.api_url, self.repo_path(), pr_id),
                "/head/sha",
            ),
            ForgeFlavor::Gitlab => (
                format!(
                    "{}/{}/merge_requests/{}",
                    self.api_url,
                    self.repo_path(),
                    pr_id
                ),
                "/sha",
            ),
            ForgeFlavor::Pagure => (
                format!(
                    "{}/{}/pull-request/{}",
                    self.api_url,
                    self.repo_path(),
                    pr_id
                ),
                "/commit_stop",
            ),
        };
        let info = self.get_json(&url).await?;
        Ok(info
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn get_issue(&self, id: i64) -> Result<Issue, ForgeError> {
        let url = match self.flavor {
            ForgeFlavor::Github => format!("{}/{}/issues/{}", self.api_url, self.repo_path(), id),
            ForgeFlavor::Gitlab => format!("{}/{}/issues/{}", self.api_url, self.repo_path(), id),
            ForgeFlavor::Pagure => format!("{}/{}/issue/{}", self.api_url, self.repo_path(), id),
        };
        let info = self.get_json(&url).await?;
        Ok(Issue {
            id,
            title: info["title"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn search_issue_by_title(&self, title: &str) -> Result<Option<Issue>, ForgeError> {
        let url = match self.flavor {
            ForgeFlavor::Github => format!(
                "{}/{}/issues?state=open&per_page=100",
                self.api_url,
                self.repo_path()
            ),
            ForgeFlavor::Gitlab => format!(
                "{}/{}/issues?state=opened&per_page=100",
                self.api_url,
                self.repo_path()
            ),
            ForgeFlavor::Pagure => {
                format!("{}/{}/issues?status=Open", self.api_url, self.repo_path())
            }
        };
        let listing = self.get_json(&url).await?;
        let issues = match self.flavor {
            ForgeFlavor::Pagure => listing["issues"].as_array().cloned().unwrap_or_default(),
            _ => listing.as_array().cloned().unwrap_or_default(),
        };
        for issue in issues {
            if issue["title"].as_str() == Some(title) {
                let id = match self.flavor {
                    ForgeFlavor::Github => issue["number"].as_i64(),
                    ForgeFlavor::Gitlab => issue["iid"].as_i64(),
                    ForgeFlavor::Pagure => issue["id"].as_i64(),
                };
                if let Some(id) = id {
                    return Ok(Some(Issue {
                        id,
                        title: title.to_string(),
                    }));
                }
            }
        }
        Ok(None)
    }

    async fn create_issue(&self, title: &str, body: &str) -> Result<Issue, ForgeError> {
        let (url, payload) = match self.flavor {
            ForgeFlavor::Github => (
                format!("{}/{}/issues", self.api_url, self.repo_path()),
                serde_json::json!({"title": title, "body": body}),
            ),
            ForgeFlavor::Gitlab => (
                format!("{}/{}/issues", self.api_url, self.repo_path()),
                serde_json::json!({"title": title, "description": body}),
            ),
            ForgeFlavor::Pagure => (
                format!("{}/{}/new_issue", self.api_url, self.repo_path()),
                serde_json::json!({"title": title, "issue_content": body}),
            ),
        };
        let created = self.post_json(&url, &payload).await?;
        let id = match self.flavor {
            ForgeFlavor::Github => created["number"].as_i64(),
            ForgeFlavor::Gitlab => created["iid"].as_i64(),
            ForgeFlavor::Pagure => created["issue"]["id"].as_i64(),
        };
        Ok(Issue {
            id: id.unwrap_or_default(),
            title: title.to_string(),
        })
    }

    async fn comment_issue(&self, id: i64, body: &str) -> Result<(), ForgeError> {
        let (url, payload) = match self.flavor {
            ForgeFlavor::Github => (
                format!("{}/{}/issues/{}/comments", self.api_url, self.repo_path(), id),
                serde_json::json!({"body": body}),
            ),
            ForgeFlavor::Gitlab => (
                format!("{}/{}/issues/{}/notes", self.api_url, self.repo_path(), id),
                serde_json::json!({"body": body}),
            ),
            ForgeFlavor::Pagure => (
                format!("{}/{}/issue/{}/comment", self.api_url, self.repo_path(), id),
                serde_json::json!({"comment": body}),
            ),
        };
        self.post_json(&url, &payload).await?;
        Ok(())
    }

    async fn comment_pr(&self, pr_id: i64, body: &str) -> Result<(), ForgeError> {
        let (url, payload) = match self.flavor {
            // PR comments go through the issues API on GitHub.
            ForgeFlavor::Github => (
                format!(
                    "{}/{}/issues/{}/comments",
                    self.api_url,
                    self.repo_path(),
                    pr_id
                ),
                serde_json::json!({"body": body}),
            ),
            ForgeFlavor::Gitlab => (
                format!(
                    "{}/{}/merge_requests/{}/notes",
                    self.api_url,
                    self.repo_path(),
                    pr_id
                ),
                serde_json::json!({"body": body}),
            ),
            ForgeFlavor::Pagure => (
                format!(
                    "{}/{}/pull-request/{}/comment",
                    self.api_url,
                    self.repo_path(),
                    pr_id
                ),
                serde_json::json!({"comment": body}),
            ),
        };
        self.post_json(&url, &payload).await?;
        Ok(())
    }

    async fn set_commit_status(
        &self,
        sha: &str,
        state: &str,
        description: &str,
        context: &str,
    ) -> Result<(), ForgeError> {
        let (url, payload) = match self.flavor {
            ForgeFlavor::Github => (
                format!("{}/{}/statuses/{}", self.api_url, self.repo_path(), sha),
                serde_json::json!({
                    "state": state,
                    "description": description,
                    "context": context,
                }),
            ),
            ForgeFlavor::Gitlab => (
                format!("{}/{}/statuses/{}", self.api_url, self.repo_path(), sha),
                serde_json::json!({
                    "state": state,
                    "description": description,
                    "name": context,
                }),
            ),
            ForgeFlavor::Pagure => (
                format!(
                    "{}/{}/c/{}/flag",
                    self.api_url,
                    self.repo_path(),
                    sha
                ),
                serde_json::json!({
                    "username": context,
                    "status": state,
                    "comment": description,
                }),
            ),
        };
        self.post_json(&url, &payload).await?;
        Ok(())
    }
}

/// Denial reporting through commit statuses rather than issues.
#[async_trait]
pub trait CommitStatusReporter: Send + Sync {
    async fn report_failure(&self, description: &str) -> anyhow::Result<()>;
}

pub struct ForgeStatusReporter {
    pub project: Arc<dyn GitProject>,
    pub commit_sha: Option<String>,
    pub context: String,
}

#[async_trait]
impl CommitStatusReporter for ForgeStatusReporter {
    async fn report_failure(&self, description: &str) -> anyhow::Result<()> {
        let Some(sha) = &self.commit_sha else {
            tracing::warn!("No commit to flag, denial not reported: {}", description);
            return Ok(());
        };
        self.project
            .set_commit_status(sha, "failure", description, &self.context)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_project_url() {
        assert_eq!(
            split_project_url("https://github.com/packit/ogr"),
            Some(("github.com".into(), "packit".into(), "ogr".into()))
        );
        assert_eq!(
            split_project_url("https://gitlab.com/group/subgroup/project/"),
            Some(("gitlab.com".into(), "group/subgroup".into(), "project".into()))
        );
        assert_eq!(
            split_project_url("https://src.fedoraproject.org/rpms/python-ogr.git"),
            Some((
                "src.fedoraproject.org".into(),
                "rpms".into(),
                "python-ogr".into()
            ))
        );
        assert_eq!(split_project_url("https://github.com/just-a-user"), None);
        assert_eq!(split_project_url("not a url"), None);
    }

    #[test]
    fn test_flavor_resolution() {
        let clients = ForgeClients {
            github_api_url: "https://api.github.com".into(),
            github_token: String::new(),
            gitlab_api_url: "https://gitlab.com/api/v4".into(),
            gitlab_token: String::new(),
            pagure_api_url: "https://src.fedoraproject.org/api".into(),
            pagure_token: String::new(),
            client: reqwest::Client::new(),
        };

        let project = clients.project("https://github.com/packit/ogr").unwrap();
        assert_eq!(project.flavor, ForgeFlavor::Github);
        assert_eq!(project.namespace(), "packit");
        assert_eq!(project.repo(), "ogr");

        let project = clients.project("https://gitlab.com/packit/ogr").unwrap();
        assert_eq!(project.flavor, ForgeFlavor::Gitlab);

        let project = clients
            .project("https://src.fedoraproject.org/rpms/python-ogr")
            .unwrap();
        assert_eq!(project.flavor, ForgeFlavor::Pagure);
        assert_eq!(project.namespace(), "rpms");
    }

    #[test]
    fn test_validate_signature_round_trip() {
        let secret = "s3cr3t";
        let payload = b"{\"zen\": \"Design for failure.\"}";

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(validate_signature(secret, payload, &signature));
        assert!(!validate_signature(secret, b"tampered", &signature));
        assert!(!validate_signature(secret, payload, "sha256=deadbeef"));
    }

    #[test]
    fn test_validate_signature_no_secret_passes() {
        assert!(validate_signature("", b"anything", "whatever"));
    }
}
