//! Checkers guarding Bodhi release-update jobs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::koji::KojiBuildState;
use crate::events::{EventData, EventKind};
use crate::models::job::JobConfig;
use crate::services::branches::get_branches;
use crate::services::forge::GitProject;
use crate::services::koji::KojiBuildDataSource;
use crate::services::packagers::PackagerLookup;
use crate::services::reporting::IssueReporter;

use super::{ActorChecker, Checker};

/// An update may only follow a finished Koji build on a configured branch.
pub struct IsKojiBuildCompleteAndBranchConfigured {
    pub job_config: JobConfig,
    pub data: EventData,
    pub source: Arc<dyn KojiBuildDataSource>,
}

#[async_trait]
impl Checker for IsKojiBuildCompleteAndBranchConfigured {
    fn name(&self) -> &'static str {
        "IsKojiBuildCompleteAndBranchConfigured"
    }

    /// Check that builds are finished and their branches configured.
    ///
    /// The `fedora-stable` alias is the default: rawhide updates are
    /// already created automatically.
    async fn pre_check(&self) -> anyhow::Result<bool> {
        match self.data.kind {
            EventKind::PullRequestCommentPagure | EventKind::KojiBuild => {}
            // Events this checker does not specialize in never block.
            _ => return Ok(true),
        }

        for build in self.source.koji_build_data().await? {
            if build.state != KojiBuildState::Complete {
                tracing::debug!(
                    build_id = build.build_id,
                    branch = %build.dist_git_branch,
                    "Skipping build, not finished yet"
                );
                return Ok(false);
            }

            let aliases: BTreeSet<String> = if self.job_config.dist_git_branches.is_empty() {
                BTreeSet::from(["fedora-stable".to_string()])
            } else {
                self.job_config.dist_git_branches.clone()
            };
            // Koji calls the rolling branch rawhide, not main.
            let configured_branches = get_branches(&aliases, "rawhide");
            if !configured_branches.contains(&build.dist_git_branch) {
                tracing::info!(
                    branch = %build.dist_git_branch,
                    configured = ?configured_branches,
                    "Skipping build, Bodhi update not configured for this branch"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Retriggering an update via a comment needs write access to the project.
pub struct HasIssueCommenterRetriggeringPermissions {
    pub data: EventData,
    pub actor: String,
    pub project: Arc<dyn GitProject>,
    pub reporter: Arc<dyn IssueReporter>,
}

#[async_trait]
impl Checker for HasIssueCommenterRetriggeringPermissions {
    fn name(&self) -> &'static str {
        "HasIssueCommenterRetriggeringPermissions"
    }

    async fn pre_check(&self) -> anyhow::Result<bool> {
        match self.data.kind {
            EventKind::IssueCommentGithub | EventKind::IssueCommentGitlab => {
                let issue_id = self.data.issue_id.unwrap_or_default();
                tracing::debug!(
                    repo = %self.data.project_url,
                    issue = issue_id,
                    actor = %self.actor,
                    "Re-triggering Bodhi update through an issue comment"
                );
                if !self.project.has_write_access(&self.actor).await? {
                    let msg = format!(
                        "Re-triggering the Bodhi update through a comment in repo \
                         **{}** and issue **{}** is not allowed for user *{}*: \
                         write access to the project is required.",
                        self.data.project_url, issue_id, self.actor
                    );
                    tracing::info!("{}", msg);
                    let issue = self.project.get_issue(issue_id).await?;
                    self.report_pre_check_failure(&issue.title, &msg).await?;
                    return Ok(false);
                }
                Ok(true)
            }
            EventKind::PullRequestCommentPagure => {
                let pr_id = self.data.pr_id.unwrap_or_default();
                tracing::debug!(
                    repo = %self.data.project_url,
                    pr = pr_id,
                    actor = %self.actor,
                    "Re-triggering Bodhi update through a dist-git comment"
                );
                if !self.project.has_write_access(&self.actor).await? {
                    let msg = format!(
                        "Re-triggering the Bodhi update through a dist-git comment in \
                         **PR#{}** of project **{}** is not allowed for user *{}*: \
                         write access to the project is required.",
                        pr_id,
                        self.project.repo(),
                        self.actor
                    );
                    tracing::info!("{}", msg);
                    self.report_pre_check_failure(
                        "Re-triggering Bodhi update through comment failed",
                        &msg,
                    )
                    .await?;
                    return Ok(false);
                }
                Ok(true)
            }
            _ => Ok(true),
        }
    }
}

#[async_trait]
impl ActorChecker for HasIssueCommenterRetriggeringPermissions {
    fn actor(&self) -> &str {
        &self.actor
    }

    fn reporter(&self) -> &dyn IssueReporter {
        self.reporter.as_ref()
    }
}

/// Dist-git comment retriggers are reserved for registered packagers.
pub struct IsAuthorAPackager {
    pub data: EventData,
    pub actor: String,
    pub packagers: Arc<dyn PackagerLookup>,
    pub reporter: Arc<dyn IssueReporter>,
}

#[async_trait]
impl Checker for IsAuthorAPackager {
    fn name(&self) -> &'static str {
        "IsAuthorAPackager"
    }

    async fn pre_check(&self) -> anyhow::Result<bool> {
        if self.data.kind != EventKind::PullRequestCommentPagure {
            return Ok(true);
        }

        if !self.packagers.is_packager(&self.actor).await? {
            let msg = format!(
                "Re-triggering the Bodhi update through a dist-git comment in \
                 **PR#{}** of project **{}** is not allowed: user *{}* \
                 is not a packager.",
                self.data.pr_id.unwrap_or_default(),
                self.data.project_url,
                self.actor
            );
            tracing::info!("{}", msg);
            self.report_pre_check_failure(
                "Re-triggering Bodhi update through dist-git comment failed",
                &msg,
            )
            .await?;
            return Ok(false);
        }

        Ok(true)
    }
}

#[async_trait]
impl ActorChecker for IsAuthorAPackager {
    fn actor(&self) -> &str {
        &self.actor
    }

    fn reporter(&self) -> &dyn IssueReporter {
        self.reporter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::testing::{FakeProject, RecordingReporter};
    use crate::events::koji::KojiBuildData;
    use crate::models::job::{JobTrigger, JobType};
    use crate::services::reporting::MSG_GET_IN_TOUCH;

    struct FakeSource(Vec<KojiBuildData>);

    #[async_trait]
    impl KojiBuildDataSource for FakeSource {
        async fn koji_build_data(&self) -> anyhow::Result<Vec<KojiBuildData>> {
            Ok(self.0.clone())
        }
    }

    struct FakePackagers(bool);

    #[async_trait]
    impl PackagerLookup for FakePackagers {
        async fn is_packager(&self, _user: &str) -> anyhow::Result<bool> {
            Ok(self.0)
        }
    }

    fn bodhi_job(branches: &[&str]) -> JobConfig {
        JobConfig {
            job: JobType::BodhiUpdate,
            trigger: JobTrigger::Commit,
            targets: Default::default(),
            dist_git_branches: branches.iter().map(|b| b.to_string()).collect(),
            branch: None,
            scratch: false,
            issue_repository: None,
        }
    }

    fn koji_event() -> EventData {
        EventData::new(
            EventKind::KojiBuild,
            "https://src.fedoraproject.org/rpms/python-ogr",
        )
    }

    fn build(state: KojiBuildState, branch: &str) -> KojiBuildData {
        KojiBuildData {
            build_id: 1,
            dist_git_branch: branch.to_string(),
            state,
        }
    }

    fn branch_checker(
        job: JobConfig,
        data: EventData,
        builds: Vec<KojiBuildData>,
    ) -> IsKojiBuildCompleteAndBranchConfigured {
        IsKojiBuildCompleteAndBranchConfigured {
            job_config: job,
            data,
            source: Arc::new(FakeSource(builds)),
        }
    }

    #[tokio::test]
    async fn test_unrelated_event_kind_passes() {
        // Even an unfinished build cannot block an event kind the checker
        // does not specialize in.
        let checker = branch_checker(
            bodhi_job(&[]),
            EventData::new(EventKind::PushGithub, "https://github.com/packit/ogr"),
            vec![build(KojiBuildState::Building, "f40")],
        );
        assert!(checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unfinished_build_skips() {
        let checker = branch_checker(
            bodhi_job(&["f40"]),
            koji_event(),
            vec![build(KojiBuildState::Building, "f40")],
        );
        assert!(!checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_complete_build_on_configured_branch_passes() {
        let checker = branch_checker(
            bodhi_job(&["f40"]),
            koji_event(),
            vec![build(KojiBuildState::Complete, "f40")],
        );
        assert!(checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_complete_build_on_other_branch_skips() {
        let checker = branch_checker(
            bodhi_job(&["f40"]),
            koji_event(),
            vec![build(KojiBuildState::Complete, "epel9")],
        );
        assert!(!checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_default_alias_is_fedora_stable() {
        let checker = branch_checker(
            bodhi_job(&[]),
            koji_event(),
            vec![build(KojiBuildState::Complete, "f41")],
        );
        assert!(checker.pre_check().await.unwrap());

        // Rawhide is not part of fedora-stable.
        let checker = branch_checker(
            bodhi_job(&[]),
            koji_event(),
            vec![build(KojiBuildState::Complete, "rawhide")],
        );
        assert!(!checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_no_build_data_passes_vacuously() {
        let checker = branch_checker(bodhi_job(&["f40"]), koji_event(), vec![]);
        assert!(checker.pre_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_one_bad_build_among_many_skips() {
        let checker = branch_checker(
            bodhi_job(&["f40", "f41"]),
            koji_event(),
            vec![
                build(KojiBuildState::Complete, "f40"),
                build(KojiBuildState::Failed, "f41"),
            ],
        );
        assert!(!checker.pre_check().await.unwrap());
    }

    fn commenter_checker(
        kind: EventKind,
        write_access: bool,
    ) -> (HasIssueCommenterRetriggeringPermissions, Arc<RecordingReporter>) {
        let mut data = EventData::new(kind, "https://github.com/packit/ogr");
        data.issue_id = Some(7);
        data.pr_id = Some(21);
        let reporter = Arc::new(RecordingReporter::default());
        let checker = HasIssueCommenterRetriggeringPermissions {
            data,
            actor: "bfu".to_string(),
            project: Arc::new(FakeProject::new(write_access, write_access)),
            reporter: reporter.clone(),
        };
        (checker, reporter)
    }

    #[tokio::test]
    async fn test_commenter_with_write_access_passes_silently() {
        let (checker, reporter) = commenter_checker(EventKind::IssueCommentGithub, true);
        assert!(checker.pre_check().await.unwrap());
        assert!(reporter.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commenter_without_write_access_is_denied_with_message() {
        let (checker, reporter) = commenter_checker(EventKind::IssueCommentGitlab, false);
        assert!(!checker.pre_check().await.unwrap());

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (title, message, comment) = &reports[0];
        // The tracking issue keeps its own title.
        assert_eq!(title, "Tracking issue");
        assert!(comment.contains("issue **7**"));
        assert!(comment.contains("*bfu*"));
        // Fresh issue body carries the contact footer, the comment does not.
        assert_eq!(*message, format!("{comment}{MSG_GET_IN_TOUCH}"));
    }

    #[tokio::test]
    async fn test_dist_git_commenter_denial_cites_pr() {
        let (checker, reporter) = commenter_checker(EventKind::PullRequestCommentPagure, false);
        assert!(!checker.pre_check().await.unwrap());

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (title, _, comment) = &reports[0];
        assert_eq!(title, "Re-triggering Bodhi update through comment failed");
        assert!(comment.contains("PR#21"));
    }

    #[tokio::test]
    async fn test_commenter_checker_ignores_other_kinds() {
        let (checker, reporter) = commenter_checker(EventKind::PushGithub, false);
        assert!(checker.pre_check().await.unwrap());
        assert!(reporter.reports.lock().unwrap().is_empty());
    }

    fn packager_checker(
        kind: EventKind,
        is_packager: bool,
    ) -> (IsAuthorAPackager, Arc<RecordingReporter>) {
        let mut data = EventData::new(kind, "https://src.fedoraproject.org/rpms/python-ogr");
        data.pr_id = Some(21);
        let reporter = Arc::new(RecordingReporter::default());
        let checker = IsAuthorAPackager {
            data,
            actor: "maja".to_string(),
            packagers: Arc::new(FakePackagers(is_packager)),
            reporter: reporter.clone(),
        };
        (checker, reporter)
    }

    #[tokio::test]
    async fn test_packager_passes() {
        let (checker, reporter) = packager_checker(EventKind::PullRequestCommentPagure, true);
        assert!(checker.pre_check().await.unwrap());
        assert!(reporter.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_packager_is_denied_with_message() {
        let (checker, reporter) = packager_checker(EventKind::PullRequestCommentPagure, false);
        assert!(!checker.pre_check().await.unwrap());

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].2.contains("is not a packager"));
        assert!(reports[0].2.contains("*maja*"));
    }

    #[tokio::test]
    async fn test_packager_checker_ignores_other_kinds() {
        let (checker, reporter) = packager_checker(EventKind::IssueCommentGithub, false);
        assert!(checker.pre_check().await.unwrap());
        assert!(reporter.reports.lock().unwrap().is_empty());
    }
}
