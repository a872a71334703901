//! Turn protocol runtime for LLM-assisted issue triage.
//!
//! A run drives at most three chat turns for one issue: the issue alone,
//! then up to two batches of repository files the model asked for. The
//! decoded result of each turn decides whether the run finishes or fetches
//! another batch, and every run that does not fail on transport ends with
//! exactly one comment body and an optional classification label.

pub mod classification;
pub mod content_guard;
pub mod context_builder;
pub mod error;
pub mod outcome_publisher;
pub mod response_decoder;
pub mod run_report;
pub mod runtime;
pub mod system_prompt;
pub mod turn_protocol;

pub use classification::Classification;
pub use content_guard::{ContentGuard, FileBody, FileContent, MAX_FILE_BYTES};
pub use context_builder::{render_file_contents, render_issue_details};
pub use error::TriageError;
pub use outcome_publisher::{publish_outcome, FinalOutcome, PublishReport};
pub use response_decoder::{decode_turn, DecodedTurn, TurnPayload, MAX_REQUESTED_FILES};
pub use run_report::{append_github_output, write_output_file};
pub use runtime::{run_issue_triage, TriageRunReport, TriageRunRequest};
pub use system_prompt::load_system_prompt;
pub use turn_protocol::{
    Conversation, FallbackReason, ProtocolStep, TokioTurnDelay, TransitionDirective,
    TurnDelay, TurnProtocolConfig, TurnProtocolController, DEFAULT_TURN_DELAY_MS, MAX_TURNS,
};
