use triage_github::IssueTracker;

use crate::classification::Classification;
use crate::error::TriageError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal result of a run: exactly one comment body and at most one label.
pub struct FinalOutcome {
    classification: Option<Classification>,
    comment_body: String,
}

impl FinalOutcome {
    pub fn new(classification: Option<Classification>, comment_body: impl Into<String>) -> Self {
        Self {
            classification,
            comment_body: comment_body.into(),
        }
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    pub fn comment_body(&self) -> &str {
        &self.comment_body
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub comment_id: u64,
    pub label_applied: bool,
}

/// Posts the comment, then the label. A failed comment is fatal; a failed
/// label is logged and the run still counts as published.
pub async fn publish_outcome(
    tracker: &dyn IssueTracker,
    issue_number: u64,
    outcome: FinalOutcome,
) -> Result<PublishReport, TriageError> {
    let comment_id = tracker
        .create_comment(issue_number, outcome.comment_body())
        .await
        .map_err(TriageError::Publish)?;
    tracing::info!(issue_number, comment_id, "posted triage comment");

    let Some(label) = outcome.classification() else {
        return Ok(PublishReport {
            comment_id,
            label_applied: false,
        });
    };

    let label_applied = match tracker
        .add_labels(issue_number, &[label.as_str().to_string()])
        .await
    {
        Ok(()) => {
            tracing::info!(issue_number, label = label.as_str(), "applied label");
            true
        }
        Err(error) => {
            tracing::warn!(
                issue_number,
                label = label.as_str(),
                error = %format!("{error:#}"),
                "failed to apply label"
            );
            false
        }
    };
    Ok(PublishReport {
        comment_id,
        label_applied,
    })
}
