//! Checkers guarding VM-image build jobs.
//!
//! These run for comment-triggered image builds on a pull request; denials
//! are reported right back onto the PR as a comment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::EventData;
use crate::models::job::JobConfig;
use crate::services::build_records::CoprBuildStore;
use crate::services::forge::GitProject;

use super::Checker;

async fn report_failure(
    project: &dyn GitProject,
    pr_id: Option<i64>,
    message: &str,
) -> anyhow::Result<()> {
    match pr_id {
        Some(pr_id) => project.comment_pr(pr_id, message).await?,
        None => tracing::warn!("No PR to comment on, denial not reported: {}", message),
    }
    Ok(())
}

/// The image is built from packages, so a successful Copr build for the
/// commit and chroot must already exist.
pub struct IsCoprBuildForChrootOk {
    pub job_config: JobConfig,
    pub data: EventData,
    pub store: Arc<dyn CoprBuildStore>,
    pub project: Arc<dyn GitProject>,
}

#[async_trait]
impl Checker for IsCoprBuildForChrootOk {
    fn name(&self) -> &'static str {
        "IsCoprBuildForChrootOk"
    }

    async fn pre_check(&self) -> anyhow::Result<bool> {
        let Some(commit_sha) = &self.data.commit_sha else {
            anyhow::bail!("no commit sha on the event, cannot look up Copr builds");
        };

        let builds = self.store.get_all_by_commit(commit_sha).await?;
        if builds.is_empty() {
            let msg = format!("No Copr build found for commit sha {commit_sha}");
            tracing::info!("{}", msg);
            report_failure(self.project.as_ref(), self.data.pr_id, &msg).await?;
            return Ok(false);
        }

        for target in &self.job_config.targets {
            let successful = builds
                .iter()
                .any(|build| build.target == *target && build.status == "success");
            if !successful {
                let msg = format!(
                    "No successful Copr build found for project {}/{} commit {} \
                     and chroot (target) {}",
                    builds[0].owner, builds[0].project_name, commit_sha, target
                );
                tracing::info!("{}", msg);
                report_failure(self.project.as_ref(), self.data.pr_id, &msg).await?;
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Only authors with write access may build images, whatever the event.
pub struct HasAuthorWriteAccess {
    pub data: EventData,
    pub actor: String,
    pub project: Arc<dyn GitProject>,
}

#[async_trait]
impl Checker for HasAuthorWriteAccess {
    fn name(&self) -> &'static str {
        "HasAuthorWriteAccess"
    }

    async fn pre_check(&self) -> anyhow::Result<bool> {
        if !self.project.has_write_access(&self.actor).await? {
            let msg = format!(
                "User *{}* is not allowed to trigger a VM image build for \
                 project **{}**: write access is required.",
                self.actor, self.data.project_url
            );
            tracing::info!("{}", msg);
            report_failure(self.project.as_ref(), self.data.pr_id, &msg).await?;
            return Ok(false);
        }
        Ok(true)
    }
}
