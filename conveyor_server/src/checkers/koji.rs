//! Checkers guarding upstream Koji build jobs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{EventData, EventKind};
use crate::models::job::JobConfig;
use crate::services::forge::{CommitStatusReporter, GitProject};

use super::Checker;

/// Who and what may trigger a Koji build from the upstream repository.
pub struct PermissionOnKojiBuild {
    pub job_config: JobConfig,
    pub data: EventData,
    pub project: Arc<dyn GitProject>,
    pub status: Arc<dyn CommitStatusReporter>,
    /// Service admins may always trigger.
    pub admins: BTreeSet<String>,
}

#[async_trait]
impl Checker for PermissionOnKojiBuild {
    fn name(&self) -> &'static str {
        "PermissionOnKojiBuild"
    }

    async fn pre_check(&self) -> anyhow::Result<bool> {
        // Closed merge requests only clean up, they never trigger builds.
        if self.data.kind == EventKind::MergeRequestGitlab
            && self.data.action.as_deref() == Some("closed")
        {
            return Ok(false);
        }

        if matches!(
            self.data.kind,
            EventKind::PushGithub | EventKind::PushGitlab | EventKind::PushPagure
        ) {
            let configured_branch = match &self.job_config.branch {
                Some(branch) => branch.clone(),
                None => self.project.default_branch().await?,
            };
            if self.data.git_ref.as_deref() != Some(configured_branch.as_str()) {
                tracing::info!(
                    pushed = ?self.data.git_ref,
                    configured = %configured_branch,
                    "Push to a non-configured branch, skipping Koji build"
                );
                return Ok(false);
            }
        }

        if !self.job_config.scratch {
            self.status
                .report_failure("Non-scratch Koji builds are not possible from upstream.")
                .await?;
            return Ok(false);
        }

        if matches!(
            self.data.kind,
            EventKind::PullRequestGithub | EventKind::MergeRequestGitlab
        ) {
            let actor = self.data.actor.as_deref().unwrap_or_default();
            let allowed =
                self.project.can_merge_pr(actor).await? || self.admins.contains(actor);
            if !allowed {
                self.status
                    .report_failure(&format!(
                        "User {actor} cannot trigger a Koji build: only users who can \
                         merge the pull request may do so."
                    ))
                    .await?;
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{FakeProject, RecordingStatus};
    use crate::models::job::{JobTrigger, JobType};

    fn koji_job(scratch: bool, branch: Option<&str>) -> JobConfig {
        JobConfig {
            job: JobType::UpstreamKojiBuild,
            trigger: match branch {
                Some(_) => JobTrigger::Commit,
                None => JobTrigger::PullRequest,
            },
            targets: BTreeSet::from(["fedora-41".to_string()]),
            dist_git_branches: Default::default(),
            branch: branch.map(String::from),
            scratch,
            issue_repository: None,
        }
    }

    fn event(kind: EventKind, action: Option<&str>, git_ref: Option<&str>) -> EventData {
        let mut data = EventData::new(kind, "https://github.com/packit/ogr");
        data.actor = Some("bfu".to_string());
        data.action = action.map(String::from);
        data.git_ref = git_ref.map(String::from);
        data
    }

    fn checker(
        job: JobConfig,
        data: EventData,
        can_merge: bool,
    ) -> (PermissionOnKojiBuild, Arc<RecordingStatus>) {
        let status = Arc::new(RecordingStatus::default());
        let checker = PermissionOnKojiBuild {
            job_config: job,
            data,
            project: Arc::new(FakeProject::new(can_merge, can_merge)),
            status: status.clone(),
            admins: BTreeSet::new(),
        };
        (checker, status)
    }

    #[tokio::test]
    async fn test_closed_merge_requests_are_ignored() {
        let (checker, status) = checker(
            koji_job(true, None),
            event(EventKind::MergeRequestGitlab, Some("closed"), None),
            true,
        );
        assert!(!checker.pre_check().await.unwrap());
        // Soft skip: nothing reported.
        assert!(status.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_to_non_configured_branch_is_ignored() {
        for kind in [
            EventKind::PushGithub,
            EventKind::PushGitlab,
            EventKind::PushPagure,
        ] {
            let (checker, status) =
                checker(koji_job(true, Some("release")), event(kind, None, None), true);
            assert!(!checker.pre_check().await.unwrap());
            assert!(status.failures.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_push_to_configured_branch_passes() {
        let (checker, _) = checker(
            koji_job(true, Some("release")),
            event(EventKind::PushPagure, None, Some("release")),
            true,
        );
        assert!(checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_default_branch_is_used_when_none_configured() {
        // FakeProject's default branch is "main".
        let (checker, _) = checker(
            koji_job(true, None),
            event(EventKind::PushGithub, None, Some("main")),
            true,
        );
        assert!(checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_non_scratch_builds_are_prohibited() {
        let (checker, status) = checker(
            koji_job(false, None),
            event(EventKind::MergeRequestGitlab, None, None),
            true,
        );
        assert!(!checker.pre_check().await.unwrap());

        let failures = status.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("Non-scratch"));
    }

    #[tokio::test]
    async fn test_pr_author_without_merge_rights_is_denied() {
        for kind in [EventKind::PullRequestGithub, EventKind::MergeRequestGitlab] {
            let (checker, status) = checker(koji_job(true, None), event(kind, None, None), false);
            assert!(!checker.pre_check().await.unwrap());
            assert_eq!(status.failures.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_pr_author_with_merge_rights_passes() {
        for kind in [EventKind::PullRequestGithub, EventKind::MergeRequestGitlab] {
            let (checker, status) = checker(koji_job(true, None), event(kind, None, None), true);
            assert!(checker.pre_check().await.unwrap());
            assert!(status.failures.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_admin_bypasses_merge_rights() {
        let status = Arc::new(RecordingStatus::default());
        let checker = PermissionOnKojiBuild {
            job_config: koji_job(true, None),
            data: event(EventKind::PullRequestGithub, None, None),
            project: Arc::new(FakeProject::new(false, false)),
            status: status.clone(),
            admins: BTreeSet::from(["bfu".to_string()]),
        };
        assert!(checker.pre_check().await.unwrap());
        assert!(status.failures.lock().unwrap().is_empty());
    }
}
