//! Packaging-authority lookup (Fedora accounts).

use async_trait::async_trait;

#[async_trait]
pub trait PackagerLookup: Send + Sync {
    /// Whether the user belongs to the packager group.
    async fn is_packager(&self, user: &str) -> anyhow::Result<bool>;
}

pub struct FasClient {
    api_url: String,
    client: reqwest::Client,
}

impl FasClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PackagerLookup for FasClient {
    async fn is_packager(&self, user: &str) -> anyhow::Result<bool> {
        let url = format!("{}/v1/users/{}/groups/", self.api_url, user);
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "conveyor")
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(false);
        }
        if !resp.status().is_success() {
            anyhow::bail!("accounts API error: {}", resp.status());
        }

        let body: serde_json::Value = resp.json().await?;
        let groups = body["result"].as_array().cloned().unwrap_or_default();
        Ok(groups
            .iter()
            .any(|group| group["groupname"].as_str() == Some("packager")))
    }
}
