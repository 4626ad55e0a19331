//! Denial reporting through a tracking-issue repository.
//!
//! The channel decides create-vs-comment on its own: callers always hand in
//! both a fresh-issue rendering and a comment-only rendering of the message.

use std::sync::Arc;

use async_trait::async_trait;

use super::forge::GitProject;

/// Footer appended to fresh issue bodies.
pub const MSG_GET_IN_TOUCH: &str =
    "\n\n---\n\n*Comment here or contact the service team if you need a hand.*";

#[async_trait]
pub trait IssueReporter: Send + Sync {
    /// Deliver a denial explanation.
    ///
    /// `message` is the fresh-issue body, `comment_to_existing` the rendering
    /// used when a tracking issue with the same title is already open.
    async fn report(
        &self,
        title: &str,
        message: &str,
        comment_to_existing: &str,
    ) -> anyhow::Result<()>;
}

/// Reports into the configured issue repository on the forge.
pub struct ForgeIssueReporter {
    pub project: Arc<dyn GitProject>,
}

#[async_trait]
impl IssueReporter for ForgeIssueReporter {
    async fn report(
        &self,
        title: &str,
        message: &str,
        comment_to_existing: &str,
    ) -> anyhow::Result<()> {
        match self.project.search_issue_by_title(title).await? {
            Some(issue) => {
                tracing::debug!(issue = issue.id, "Updating existing tracking issue");
                self.project
                    .comment_issue(issue.id, comment_to_existing)
                    .await?;
            }
            None => {
                let issue = self.project.create_issue(title, message).await?;
                tracing::debug!(issue = issue.id, "Opened tracking issue");
            }
        }
        Ok(())
    }
}

/// Fallback when no issue repository is configured: the denial is only logged.
pub struct LogOnlyReporter;

#[async_trait]
impl IssueReporter for LogOnlyReporter {
    async fn report(
        &self,
        title: &str,
        message: &str,
        _comment_to_existing: &str,
    ) -> anyhow::Result<()> {
        tracing::warn!(title = title, "No issue repository configured: {}", message);
        Ok(())
    }
}
