//! Pagure (dist-git) messages from the fedora-messaging bridge -> EventData.

use serde_json::Value;

use super::{EventData, EventKind};

/// Parse a Pagure message body by its bus topic.
pub fn parse_event(topic: &str, body: &Value) -> Option<EventData> {
    if topic.ends_with("git.receive") {
        parse_push(body)
    } else if topic.ends_with("pull-request.comment.added") {
        parse_pr_comment(body)
    } else {
        tracing::debug!("Ignoring Pagure topic: {}", topic);
        None
    }
}

fn parse_push(body: &Value) -> Option<EventData> {
    let fullname = body["repo"]["fullname"].as_str()?;
    let project_url = format!("https://src.fedoraproject.org/{fullname}");

    let mut event = EventData::new(EventKind::PushPagure, project_url);
    event.actor = body["agent"].as_str().map(String::from);
    event.git_ref = body["branch"].as_str().map(String::from);
    event.commit_sha = body["end_commit"].as_str().map(String::from);
    Some(event)
}

fn parse_pr_comment(body: &Value) -> Option<EventData> {
    let pr = &body["pullrequest"];
    let fullname = pr["project"]["fullname"].as_str()?;
    let project_url = format!("https://src.fedoraproject.org/{fullname}");

    let mut event = EventData::new(EventKind::PullRequestCommentPagure, project_url);
    event.pr_id = pr["id"].as_i64();
    event.git_ref = pr["branch"].as_str().map(String::from);
    event.commit_sha = pr["commit_stop"].as_str().map(String::from);
    // The commenter is the last comment's author.
    event.actor = pr["comments"]
        .as_array()
        .and_then(|comments| comments.last())
        .and_then(|comment| comment["user"]["name"].as_str())
        .map(String::from);
    Some(event)
}
