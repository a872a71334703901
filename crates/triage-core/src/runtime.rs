use triage_ai::LlmClient;
use triage_github::{GithubIssue, IssueTracker};

use crate::classification::Classification;
use crate::content_guard::ContentGuard;
use crate::error::TriageError;
use crate::outcome_publisher::publish_outcome;
use crate::turn_protocol::{TurnDelay, TurnProtocolConfig, TurnProtocolController};

/// Collaborators for one triage run. `tracker: None` is a dry run: the
/// protocol runs in full and nothing is written to the issue.
pub struct TriageRunRequest<'a> {
    pub issue: &'a GithubIssue,
    pub client: &'a dyn LlmClient,
    pub guard: &'a ContentGuard,
    pub delay: &'a dyn TurnDelay,
    pub tracker: Option<&'a dyn IssueTracker>,
    pub config: &'a TurnProtocolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageRunReport {
    pub issue_number: u64,
    pub comment_body: String,
    pub classification: Option<Classification>,
    pub comment_id: Option<u64>,
    pub label_applied: bool,
}

pub async fn run_issue_triage(request: TriageRunRequest<'_>) -> Result<TriageRunReport, TriageError> {
    let issue_number = request.issue.number;
    let controller = TurnProtocolController::new(
        request.client,
        request.guard,
        request.delay,
        request.config,
    );
    let outcome = controller.run(request.issue).await?;
    let comment_body = outcome.comment_body().to_string();
    let classification = outcome.classification();

    let Some(tracker) = request.tracker else {
        tracing::info!(
            issue_number,
            classification = classification.map(Classification::as_str).unwrap_or("none"),
            "dry run; skipping issue tracker write"
        );
        return Ok(TriageRunReport {
            issue_number,
            comment_body,
            classification,
            comment_id: None,
            label_applied: false,
        });
    };

    let published = publish_outcome(tracker, issue_number, outcome).await?;
    Ok(TriageRunReport {
        issue_number,
        comment_body,
        classification,
        comment_id: Some(published.comment_id),
        label_applied: published.label_applied,
    })
}
