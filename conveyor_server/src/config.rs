//! Service configuration — loaded from environment variables.

use std::collections::BTreeSet;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// GitHub webhook secret for HMAC validation.
    pub github_webhook_secret: String,
    /// Shared token expected on GitLab webhook deliveries.
    pub gitlab_webhook_token: String,
    /// Bearer token expected from the fedora-messaging bridge.
    pub fedora_events_token: String,
    /// GitHub API token.
    pub github_token: String,
    /// GitLab API token.
    pub gitlab_token: String,
    /// Pagure API token.
    pub pagure_token: String,
    pub github_api_url: String,
    pub gitlab_api_url: String,
    pub pagure_api_url: String,
    /// Copr frontend and the account owning service-side projects.
    pub copr_api_url: String,
    pub copr_token: String,
    pub copr_owner: String,
    pub koji_hub_url: String,
    pub bodhi_api_url: String,
    pub bodhi_token: String,
    /// Fedora accounts API, for the packager-group lookup.
    pub fas_api_url: String,
    /// Users allowed to trigger builds regardless of forge permissions.
    pub admins: BTreeSet<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let github_webhook_secret = env_or("CONVEYOR_WEBHOOK_SECRET", "");
        let gitlab_webhook_token = env_or("CONVEYOR_GITLAB_WEBHOOK_TOKEN", "");
        let fedora_events_token = env_or("CONVEYOR_FEDORA_EVENTS_TOKEN", "");
        let github_token = env_or("CONVEYOR_GITHUB_TOKEN", "");
        let gitlab_token = env_or("CONVEYOR_GITLAB_TOKEN", "");
        let pagure_token = env_or("CONVEYOR_PAGURE_TOKEN", "");
        let admins = env_or("CONVEYOR_ADMINS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if github_webhook_secret.is_empty() {
            tracing::warn!(
                "CONVEYOR_WEBHOOK_SECRET not set -- GitHub webhook validation disabled"
            );
        }
        if github_token.is_empty() {
            tracing::warn!("CONVEYOR_GITHUB_TOKEN not set -- GitHub API calls will be anonymous");
        }

        Self {
            github_webhook_secret,
            gitlab_webhook_token,
            fedora_events_token,
            github_token,
            gitlab_token,
            pagure_token,
            github_api_url: env_or("CONVEYOR_GITHUB_API_URL", "https://api.github.com"),
            gitlab_api_url: env_or("CONVEYOR_GITLAB_API_URL", "https://gitlab.com/api/v4"),
            pagure_api_url: env_or(
                "CONVEYOR_PAGURE_API_URL",
                "https://src.fedoraproject.org/api",
            ),
            copr_api_url: env_or("CONVEYOR_COPR_API_URL", "https://copr.fedorainfracloud.org"),
            copr_token: env_or("CONVEYOR_COPR_TOKEN", ""),
            copr_owner: env_or("CONVEYOR_COPR_OWNER", "conveyor"),
            koji_hub_url: env_or("CONVEYOR_KOJI_HUB_URL", "https://koji.fedoraproject.org"),
            bodhi_api_url: env_or("CONVEYOR_BODHI_API_URL", "https://bodhi.fedoraproject.org"),
            bodhi_token: env_or("CONVEYOR_BODHI_TOKEN", ""),
            fas_api_url: env_or("CONVEYOR_FAS_API_URL", "https://fasjson.fedoraproject.org"),
            admins,
        }
    }
}
