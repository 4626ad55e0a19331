//! Bodhi release-update client.

pub struct BodhiClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

impl BodhiClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create an update from the branch's updates-candidate tag.
    pub async fn create_update(&self, dist_git_branch: &str) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "from_tag": format!("{dist_git_branch}-updates-candidate"),
            "type": "enhancement",
            "notes": "Automatic update triggered by a new build.",
        });

        let resp = self
            .client
            .post(format!("{}/updates/", self.api_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "conveyor")
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("bodhi update creation failed: {} {}", status, text);
        }

        tracing::info!(branch = dist_git_branch, "Bodhi update created");
        Ok(())
    }
}
