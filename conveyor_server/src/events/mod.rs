//! Normalized trigger events.
//!
//! Inbound forge payloads (GitHub/GitLab webhooks, fedora-messaging bridge)
//! are parsed into one immutable [`EventData`] per event. Fields that do not
//! apply to a given kind stay `None` rather than holding sentinel values.

pub mod github;
pub mod gitlab;
pub mod koji;
pub mod pagure;

use serde::{Deserialize, Serialize};

/// Closed set of recognized trigger-event variants.
///
/// Checkers match on this exhaustively; anything a checker does not
/// specialize in must take the permissive default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PushGithub,
    PushGitlab,
    PushPagure,
    PullRequestGithub,
    MergeRequestGitlab,
    PullRequestCommentGithub,
    PullRequestCommentPagure,
    IssueCommentGithub,
    IssueCommentGitlab,
    KojiBuild,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PushGithub => "push_github",
            EventKind::PushGitlab => "push_gitlab",
            EventKind::PushPagure => "push_pagure",
            EventKind::PullRequestGithub => "pull_request_github",
            EventKind::MergeRequestGitlab => "merge_request_gitlab",
            EventKind::PullRequestCommentGithub => "pull_request_comment_github",
            EventKind::PullRequestCommentPagure => "pull_request_comment_pagure",
            EventKind::IssueCommentGithub => "issue_comment_github",
            EventKind::IssueCommentGitlab => "issue_comment_gitlab",
            EventKind::KojiBuild => "koji_build",
        }
    }
}

/// Normalized view of one inbound trigger event.
///
/// Constructed once per event, immutable thereafter, read by every checker
/// in a pipeline run.
#[derive(Debug, Clone)]
pub struct EventData {
    pub kind: EventKind,
    pub actor: Option<String>,
    pub project_url: String,
    pub git_ref: Option<String>,
    pub action: Option<String>,
    pub pr_id: Option<i64>,
    pub issue_id: Option<i64>,
    pub commit_sha: Option<String>,
}

impl EventData {
    /// A minimal event of the given kind; callers fill in what applies.
    pub fn new(kind: EventKind, project_url: impl Into<String>) -> Self {
        Self {
            kind,
            actor: None,
            project_url: project_url.into(),
            git_ref: None,
            action: None,
            pr_id: None,
            issue_id: None,
            commit_sha: None,
        }
    }
}
