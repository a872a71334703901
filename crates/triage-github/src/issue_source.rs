use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::GithubIssue;

#[derive(Debug, Deserialize)]
struct IssueEventPayload {
    issue: Option<GithubIssue>,
}

/// Reads the `issue` object from a GitHub webhook event payload file, as
/// exposed to workflow jobs through `GITHUB_EVENT_PATH`.
pub fn load_issue_from_event_payload(path: &Path) -> Result<GithubIssue> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event payload {}", path.display()))?;
    let payload: IssueEventPayload = serde_json::from_str(&raw)
        .with_context(|| format!("failed to decode event payload {}", path.display()))?;
    payload
        .issue
        .with_context(|| format!("event payload {} has no issue object", path.display()))
}
