//! Copr build farm client — build submission.

pub struct CoprClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct SubmittedBuild {
    pub build_id: i64,
    pub web_url: String,
}

impl CoprClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Submit a build of `clone_url`@`committish` into owner/project.
    pub async fn submit_build(
        &self,
        owner: &str,
        project: &str,
        clone_url: &str,
        committish: &str,
        chroots: &[String],
    ) -> anyhow::Result<SubmittedBuild> {
        let payload = serde_json::json!({
            "ownername": owner,
            "projectname": project,
            "clone_url": clone_url,
            "committish": committish,
            "chroots": chroots,
        });

        let resp = self
            .client
            .post(format!("{}/api_3/build/create/scm", self.api_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "conveyor")
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("copr build submission failed: {} {}", status, text);
        }

        let body: serde_json::Value = resp.json().await?;
        let build_id = body["id"].as_i64().unwrap_or_default();
        Ok(SubmittedBuild {
            build_id,
            web_url: format!(
                "{}/coprs/{}/{}/build/{}/",
                self.api_url, owner, project, build_id
            ),
        })
    }
}
