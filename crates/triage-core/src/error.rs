use thiserror::Error;
use triage_ai::TriageAiError;

#[derive(Debug, Error)]
/// Fatal failures of a triage run. Decode, protocol, file-access and label
/// failures are recovered where they happen and never surface here.
pub enum TriageError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("chat endpoint request failed: {0}")]
    Transport(#[from] TriageAiError),
    #[error("failed to load issue: {0:#}")]
    IssueSource(anyhow::Error),
    #[error("failed to post issue comment: {0:#}")]
    Publish(anyhow::Error),
    #[error("turn protocol ended without a response after {turns} turns")]
    NoResponse { turns: usize },
}
