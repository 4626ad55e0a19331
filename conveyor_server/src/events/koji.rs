//! Koji build-state messages -> EventData + build data.

use serde_json::Value;

use super::{EventData, EventKind};

/// Koji build states, as carried in buildsys messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KojiBuildState {
    Building,
    Complete,
    Deleted,
    Failed,
    Canceled,
}

impl KojiBuildState {
    /// Numeric state codes used on the bus.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(KojiBuildState::Building),
            1 => Some(KojiBuildState::Complete),
            2 => Some(KojiBuildState::Deleted),
            3 => Some(KojiBuildState::Failed),
            4 => Some(KojiBuildState::Canceled),
            _ => None,
        }
    }
}

/// The per-branch build facts checkers evaluate.
#[derive(Debug, Clone)]
pub struct KojiBuildData {
    pub build_id: i64,
    pub dist_git_branch: String,
    pub state: KojiBuildState,
}

/// Parse a `buildsys.build.state.change` message.
///
/// Returns the normalized event plus the build data carried in the payload.
pub fn parse_event(body: &Value) -> Option<(EventData, KojiBuildData)> {
    let build_id = body["build_id"].as_i64()?;
    let state = KojiBuildState::from_code(body["new"].as_i64()?)?;
    let package = body["name"].as_str()?;

    // request = [source URL, build target, opts]; the dist-git branch is the
    // target with its "-candidate" suffix removed.
    let target = body["request"][1].as_str().unwrap_or_default();
    let dist_git_branch = target.strip_suffix("-candidate").unwrap_or(target);
    if dist_git_branch.is_empty() {
        return None;
    }

    let commit_sha = body["request"][0]
        .as_str()
        .and_then(|source| source.rsplit_once('#'))
        .map(|(_, sha)| sha.to_string());

    let mut event = EventData::new(
        EventKind::KojiBuild,
        format!("https://src.fedoraproject.org/rpms/{package}"),
    );
    event.actor = body["owner"].as_str().map(String::from);
    event.git_ref = Some(dist_git_branch.to_string());
    event.commit_sha = commit_sha;

    let data = KojiBuildData {
        build_id,
        dist_git_branch: dist_git_branch.to_string(),
        state,
    };
    Some((event, data))
}
