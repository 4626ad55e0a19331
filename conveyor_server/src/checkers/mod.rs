//! Precondition checkers — gate automated jobs before they run.
//!
//! A checker is a predicate over one (job config, event) pair with its
//! collaborators injected at construction. `Ok(true)` lets the job proceed.
//! A checker facing an event kind it does not specialize in must return
//! `Ok(true)`: irrelevant events never block.
//!
//! Denials come in two flavors. Soft skips (build not finished, branch not
//! configured) return `Ok(false)` silently and resolve themselves on the
//! next relevant event. Permission denials additionally push a user-visible
//! explanation through a reporting side channel before returning `Ok(false)`.

pub mod bodhi;
pub mod koji;
pub mod vm_image;

use async_trait::async_trait;

use crate::services::reporting::{IssueReporter, MSG_GET_IN_TOUCH};

#[async_trait]
pub trait Checker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decide whether the protected job may proceed.
    async fn pre_check(&self) -> anyhow::Result<bool>;
}

/// Checkers that act on behalf of an actor and explain their denials.
#[async_trait]
pub trait ActorChecker: Checker {
    fn actor(&self) -> &str;
    fn reporter(&self) -> &dyn IssueReporter;

    /// Send a denial explanation through the issue side channel.
    ///
    /// The bare message doubles as the comment on an existing tracking
    /// issue; fresh issues get the contact footer appended.
    async fn report_pre_check_failure(&self, title: &str, message: &str) -> anyhow::Result<()> {
        self.reporter()
            .report(title, &format!("{message}{MSG_GET_IN_TOUCH}"), message)
            .await
    }
}

/// Run checkers in order, stopping at the first denial.
pub async fn run_checkers(checkers: &[Box<dyn Checker>]) -> anyhow::Result<bool> {
    for checker in checkers {
        if !checker.pre_check().await? {
            tracing::info!(checker = checker.name(), "Pre-check failed, job skipped");
            crate::metrics::pre_check_failed(checker.name());
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-rolled fakes for the capability traits.

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::services::forge::{CommitStatusReporter, ForgeError, GitProject, Issue};
    use crate::services::reporting::IssueReporter;

    pub struct FakeProject {
        pub namespace: String,
        pub repo: String,
        pub default_branch: String,
        pub write_access: bool,
        pub can_merge: bool,
        pub pr_comments: Mutex<Vec<String>>,
    }

    impl FakeProject {
        pub fn new(write_access: bool, can_merge: bool) -> Self {
            Self {
                namespace: "packit".to_string(),
                repo: "ogr".to_string(),
                default_branch: "main".to_string(),
                write_access,
                can_merge,
                pr_comments: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GitProject for FakeProject {
        fn namespace(&self) -> &str {
            &self.namespace
        }

        fn repo(&self) -> &str {
            &self.repo
        }

        async fn default_branch(&self) -> Result<String, ForgeError> {
            Ok(self.default_branch.clone())
        }

        async fn has_write_access(&self, _user: &str) -> Result<bool, ForgeError> {
            Ok(self.write_access)
        }

        async fn can_merge_pr(&self, _user: &str) -> Result<bool, ForgeError> {
            Ok(self.can_merge)
        }

        async fn pr_head_commit(&self, _pr_id: i64) -> Result<String, ForgeError> {
            Ok("deadbeef".to_string())
        }

        async fn get_issue(&self, id: i64) -> Result<Issue, ForgeError> {
            Ok(Issue {
                id,
                title: "Tracking issue".to_string(),
            })
        }

        async fn search_issue_by_title(&self, _title: &str) -> Result<Option<Issue>, ForgeError> {
            Ok(None)
        }

        async fn create_issue(&self, title: &str, _body: &str) -> Result<Issue, ForgeError> {
            Ok(Issue {
                id: 1,
                title: title.to_string(),
            })
        }

        async fn comment_issue(&self, _id: i64, _body: &str) -> Result<(), ForgeError> {
            Ok(())
        }

        async fn comment_pr(&self, _pr_id: i64, body: &str) -> Result<(), ForgeError> {
            self.pr_comments.lock().unwrap().push(body.to_string());
            Ok(())
        }

        async fn set_commit_status(
            &self,
            _sha: &str,
            _state: &str,
            _description: &str,
            _context: &str,
        ) -> Result<(), ForgeError> {
            Ok(())
        }
    }

    /// Records (title, message, comment_to_existing) triples.
    #[derive(Default)]
    pub struct RecordingReporter {
        pub reports: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl IssueReporter for RecordingReporter {
        async fn report(
            &self,
            title: &str,
            message: &str,
            comment_to_existing: &str,
        ) -> anyhow::Result<()> {
            self.reports.lock().unwrap().push((
                title.to_string(),
                message.to_string(),
                comment_to_existing.to_string(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingStatus {
        pub failures: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommitStatusReporter for RecordingStatus {
        async fn report_failure(&self, description: &str) -> anyhow::Result<()> {
            self.failures.lock().unwrap().push(description.to_string());
            Ok(())
        }
    }
}
