//! GitHub webhook payloads -> EventData.

use serde_json::Value;

use super::{EventData, EventKind};

/// Parse a GitHub webhook into a normalized event.
///
/// Returns `None` for event types and actions this service does not react
/// to (ping, closed PRs, comment edits, ...).
pub fn parse_event(event_type: &str, payload: &Value) -> Option<EventData> {
    match event_type {
        "push" => parse_push(payload),
        "pull_request" => parse_pull_request(payload),
        "issue_comment" => parse_issue_comment(payload),
        _ => {
            tracing::debug!("Ignoring GitHub webhook event: {}", event_type);
            None
        }
    }
}

fn parse_push(payload: &Value) -> Option<EventData> {
    let project_url = payload["repository"]["html_url"].as_str()?;
    let commit_sha = payload["after"].as_str().unwrap_or_default();
    let branch = payload["ref"]
        .as_str()
        .unwrap_or_default()
        .strip_prefix("refs/heads/")
        .unwrap_or_default();

    if commit_sha.is_empty() || branch.is_empty() {
        return None;
    }

    let mut event = EventData::new(EventKind::PushGithub, project_url);
    event.actor = payload["pusher"]["name"].as_str().map(String::from);
    event.git_ref = Some(branch.to_string());
    event.commit_sha = Some(commit_sha.to_string());
    Some(event)
}

fn parse_pull_request(payload: &Value) -> Option<EventData> {
    let action = payload["action"].as_str().unwrap_or_default();
    if action != "opened" && action != "synchronize" && action != "reopened" {
        return None;
    }

    let project_url = payload["repository"]["html_url"].as_str()?;
    let mut event = EventData::new(EventKind::PullRequestGithub, project_url);
    event.action = Some(action.to_string());
    event.pr_id = payload["number"].as_i64();
    event.actor = payload["pull_request"]["user"]["login"]
        .as_str()
        .map(String::from);
    event.git_ref = payload["pull_request"]["head"]["ref"]
        .as_str()
        .map(String::from);
    event.commit_sha = payload["pull_request"]["head"]["sha"]
        .as_str()
        .map(String::from);
    Some(event)
}

fn parse_issue_comment(payload: &Value) -> Option<EventData> {
    if payload["action"].as_str() != Some("created") {
        return None;
    }

    let project_url = payload["repository"]["html_url"].as_str()?;
    let issue_number = payload["issue"]["number"].as_i64()?;
    let actor = payload["comment"]["user"]["login"].as_str().map(String::from);

    // GitHub delivers PR comments as issue comments; the `pull_request`
    // key on the issue is what tells them apart.
    let mut event = if payload["issue"]["pull_request"].is_object() {
        let mut event = EventData::new(EventKind::PullRequestCommentGithub, project_url);
        event.pr_id = Some(issue_number);
        event
    } else {
        let mut event = EventData::new(EventKind::IssueCommentGithub, project_url);
        event.issue_id = Some(issue_number);
        event
    };
    event.actor = actor;
    Some(event)
}
