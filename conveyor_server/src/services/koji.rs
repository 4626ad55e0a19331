//! Koji build system — build lookups and scratch-build submission.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::koji::{KojiBuildData, KojiBuildState};

/// Supplies the per-branch Koji build facts a checker evaluates.
///
/// An event may fan out to several builds, one per target branch.
#[async_trait]
pub trait KojiBuildDataSource: Send + Sync {
    async fn koji_build_data(&self) -> anyhow::Result<Vec<KojiBuildData>>;
}

/// Build data carried directly in a Koji build-state event.
pub struct EventKojiBuildSource {
    pub data: KojiBuildData,
}

#[async_trait]
impl KojiBuildDataSource for EventKojiBuildSource {
    async fn koji_build_data(&self) -> anyhow::Result<Vec<KojiBuildData>> {
        Ok(vec![self.data.clone()])
    }
}

/// Build data resolved from the Koji hub, latest build per branch.
///
/// Used for comment-triggered retries where no build event is at hand.
pub struct KojiServiceSource {
    pub koji: Arc<KojiClient>,
    pub package: String,
    pub branches: BTreeSet<String>,
}

#[async_trait]
impl KojiBuildDataSource for KojiServiceSource {
    async fn koji_build_data(&self) -> anyhow::Result<Vec<KojiBuildData>> {
        let mut result = Vec::new();
        for branch in &self.branches {
            if let Some(data) = self.koji.latest_build(&self.package, branch).await? {
                result.push(data);
            }
        }
        Ok(result)
    }
}

pub struct KojiClient {
    hub_url: String,
    client: reqwest::Client,
}

impl KojiClient {
    pub fn new(hub_url: &str) -> Self {
        Self {
            hub_url: hub_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Latest build of a package for one dist-git branch.
    pub async fn latest_build(
        &self,
        package: &str,
        branch: &str,
    ) -> anyhow::Result<Option<KojiBuildData>> {
        let url = format!(
            "{}/builds?package={}&branch={}&latest=1",
            self.hub_url, package, branch
        );
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "conveyor")
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("koji hub error: {}", resp.status());
        }

        let builds: serde_json::Value = resp.json().await?;
        let Some(build) = builds.as_array().and_then(|list| list.first()) else {
            return Ok(None);
        };
        let Some(build_id) = build["build_id"].as_i64() else {
            return Ok(None);
        };
        let Some(state) = build["state"].as_i64().and_then(KojiBuildState::from_code) else {
            return Ok(None);
        };
        Ok(Some(KojiBuildData {
            build_id,
            dist_git_branch: branch.to_string(),
            state,
        }))
    }

    /// Submit a scratch build of the given source for one target.
    pub async fn submit_scratch_build(&self, source: &str, target: &str) -> anyhow::Result<i64> {
        let payload = serde_json::json!({
            "source": source,
            "target": target,
            "opts": {"scratch": true},
        });
        let resp = self
            .client
            .post(format!("{}/build", self.hub_url))
            .header("User-Agent", "conveyor")
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("koji scratch build submission failed: {}", resp.status());
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body["task_id"].as_i64().unwrap_or_default())
    }
}
