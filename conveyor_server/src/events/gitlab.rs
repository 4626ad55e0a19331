//! GitLab webhook payloads -> EventData.

use serde_json::Value;

use super::{EventData, EventKind};

/// Parse a GitLab webhook into a normalized event.
pub fn parse_event(payload: &Value) -> Option<EventData> {
    match payload["object_kind"].as_str().unwrap_or_default() {
        "push" => parse_push(payload),
        "merge_request" => parse_merge_request(payload),
        "note" => parse_note(payload),
        kind => {
            tracing::debug!("Ignoring GitLab webhook event: {}", kind);
            None
        }
    }
}

fn parse_push(payload: &Value) -> Option<EventData> {
    let project_url = payload["project"]["web_url"].as_str()?;
    let branch = payload["ref"]
        .as_str()
        .unwrap_or_default()
        .strip_prefix("refs/heads/")
        .unwrap_or_default();
    let commit_sha = payload["checkout_sha"].as_str().unwrap_or_default();

    if commit_sha.is_empty() || branch.is_empty() {
        return None;
    }

    let mut event = EventData::new(EventKind::PushGitlab, project_url);
    event.actor = payload["user_username"].as_str().map(String::from);
    event.git_ref = Some(branch.to_string());
    event.commit_sha = Some(commit_sha.to_string());
    Some(event)
}

fn parse_merge_request(payload: &Value) -> Option<EventData> {
    let project_url = payload["project"]["web_url"].as_str()?;
    let attrs = &payload["object_attributes"];

    // GitLab reports "close"/"merge"; checkers only care that the MR is done.
    let action = match attrs["action"].as_str().unwrap_or_default() {
        action @ ("open" | "reopen" | "update") => action.to_string(),
        "close" | "merge" => "closed".to_string(),
        _ => return None,
    };

    let mut event = EventData::new(EventKind::MergeRequestGitlab, project_url);
    event.action = Some(action);
    event.pr_id = attrs["iid"].as_i64();
    event.actor = payload["user"]["username"].as_str().map(String::from);
    event.git_ref = attrs["source_branch"].as_str().map(String::from);
    event.commit_sha = attrs["last_commit"]["id"].as_str().map(String::from);
    Some(event)
}

fn parse_note(payload: &Value) -> Option<EventData> {
    let project_url = payload["project"]["web_url"].as_str()?;

    // Only comments on issues retrigger anything on GitLab.
    let issue_iid = payload["issue"]["iid"].as_i64()?;

    let mut event = EventData::new(EventKind::IssueCommentGitlab, project_url);
    event.issue_id = Some(issue_iid);
    event.actor = payload["user"]["username"].as_str().map(String::from);
    Some(event)
}
