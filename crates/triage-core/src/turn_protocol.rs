//! Three-step turn protocol between the triage run and the chat endpoint.
//!
//! | Step | Model input | Accepted replies |
//! |---|---|---|
//! | `IssueOnly` | issue | files, or a response |
//! | `FirstBatch` | issue + batch 1 | files xor response |
//! | `FinalBatch` | issue + batch 1 + batch 2 | response (files ignored) |
//!
//! Steps only move forward. Every step after the first is entered through
//! [`TransitionDirective::WaitThenProceed`], so the rate-limit pause is part
//! of the transition rather than of the loop body.

use std::time::Duration;

use async_trait::async_trait;
use triage_ai::{ChatRequest, ChatResponse, LlmClient, Message};
use triage_github::GithubIssue;

use crate::classification::Classification;
use crate::content_guard::{ContentGuard, FileContent};
use crate::context_builder::{render_file_contents, render_issue_details};
use crate::error::TriageError;
use crate::outcome_publisher::FinalOutcome;
use crate::response_decoder::{decode_turn, DecodedTurn, TurnPayload, MAX_REQUESTED_FILES};

pub const MAX_TURNS: usize = 3;
pub const DEFAULT_TURN_DELAY_MS: u64 = 31_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStep {
    IssueOnly,
    FirstBatch,
    FinalBatch,
}

impl ProtocolStep {
    pub fn turn_number(self) -> usize {
        match self {
            Self::IssueOnly => 1,
            Self::FirstBatch => 2,
            Self::FinalBatch => 3,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::IssueOnly => Some(Self::FirstBatch),
            Self::FirstBatch => Some(Self::FinalBatch),
            Self::FinalBatch => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssueOnly => "issue_only",
            Self::FirstBatch => "first_batch",
            Self::FinalBatch => "final_batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Scheduling attached to entering a step.
pub enum TransitionDirective {
    Proceed,
    WaitThenProceed(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Why the controller wrote the comment itself instead of using the model's.
pub enum FallbackReason {
    /// `IssueOnly` produced neither files nor a response.
    NoRelevantFiles,
    /// `FirstBatch` produced neither files nor a response.
    NothingUsable,
    /// A response and file requests arrived where they are mutually exclusive.
    ProtocolViolation,
    /// `FinalBatch` produced no response.
    NoFinalResponse,
}

impl FallbackReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoRelevantFiles => {
                "Unable to determine relevant files for this issue. Please provide more details."
            }
            Self::NothingUsable => "Unable to process this issue. Please provide more details.",
            Self::ProtocolViolation => {
                "An internal error occurred while processing this issue. A maintainer will follow up."
            }
            Self::NoFinalResponse => "Unable to provide analysis. Please provide more details.",
        }
    }

    /// Only the final-step fallback follows a complete exchange, so only it
    /// keeps the candidate label.
    pub fn keeps_classification(self) -> bool {
        matches!(self, Self::NoFinalResponse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoRelevantFiles => "no_relevant_files",
            Self::NothingUsable => "nothing_usable",
            Self::ProtocolViolation => "protocol_violation",
            Self::NoFinalResponse => "no_final_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    ModelResponse(String),
    Fallback(FallbackReason),
}

impl Resolution {
    fn into_outcome(self, candidate: Option<Classification>) -> FinalOutcome {
        match self {
            Self::ModelResponse(response) => FinalOutcome::new(candidate, response),
            Self::Fallback(reason) => FinalOutcome::new(
                candidate.filter(|_| reason.keeps_classification()),
                reason.message(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepDecision {
    Finish(Resolution),
    Advance {
        next: ProtocolStep,
        requested_files: Vec<String>,
        directive: TransitionDirective,
    },
}

/// Transition table. Pure: no I/O, no clock.
fn decide(step: ProtocolStep, decoded: &DecodedTurn, turn_delay: Duration) -> StepDecision {
    let advance = |files: &[String]| match step.next() {
        Some(next) => StepDecision::Advance {
            next,
            requested_files: files.iter().take(MAX_REQUESTED_FILES).cloned().collect(),
            directive: TransitionDirective::WaitThenProceed(turn_delay),
        },
        None => StepDecision::Finish(Resolution::Fallback(FallbackReason::NoFinalResponse)),
    };

    match (step, &decoded.payload) {
        (_, TurnPayload::Malformed(raw)) => {
            StepDecision::Finish(Resolution::ModelResponse(raw.clone()))
        }
        (_, TurnPayload::FinalResponse(response)) => {
            StepDecision::Finish(Resolution::ModelResponse(response.clone()))
        }
        (ProtocolStep::FinalBatch, TurnPayload::Conflicting { response, .. }) => {
            StepDecision::Finish(Resolution::ModelResponse(response.clone()))
        }
        (ProtocolStep::IssueOnly | ProtocolStep::FirstBatch, TurnPayload::Conflicting { .. }) => {
            StepDecision::Finish(Resolution::Fallback(FallbackReason::ProtocolViolation))
        }
        (_, TurnPayload::NeedsFiles(files)) => advance(files.as_slice()),
        (ProtocolStep::IssueOnly, TurnPayload::Empty) => {
            StepDecision::Finish(Resolution::Fallback(FallbackReason::NoRelevantFiles))
        }
        (ProtocolStep::FirstBatch, TurnPayload::Empty) => {
            StepDecision::Finish(Resolution::Fallback(FallbackReason::NothingUsable))
        }
        (ProtocolStep::FinalBatch, TurnPayload::Empty) => {
            StepDecision::Finish(Resolution::Fallback(FallbackReason::NoFinalResponse))
        }
    }
}

#[async_trait]
/// Blocking pause between turns, injectable so tests need no real time.
pub trait TurnDelay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTurnDelay;

#[async_trait]
impl TurnDelay for TokioTurnDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Default)]
/// Append-only message history owned by one run.
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: &str, issue_details: String) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(issue_details)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[derive(Debug, Clone)]
pub struct TurnProtocolConfig {
    pub system_prompt: String,
    pub model: Option<String>,
    pub turn_delay: Duration,
}

impl Default for TurnProtocolConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            model: None,
            turn_delay: Duration::from_millis(DEFAULT_TURN_DELAY_MS),
        }
    }
}

pub struct TurnProtocolController<'a> {
    client: &'a dyn LlmClient,
    guard: &'a ContentGuard,
    delay: &'a dyn TurnDelay,
    config: &'a TurnProtocolConfig,
}

impl<'a> TurnProtocolController<'a> {
    pub fn new(
        client: &'a dyn LlmClient,
        guard: &'a ContentGuard,
        delay: &'a dyn TurnDelay,
        config: &'a TurnProtocolConfig,
    ) -> Self {
        Self {
            client,
            guard,
            delay,
            config,
        }
    }

    /// Drives the protocol for one issue. Transport failures end the run;
    /// everything else resolves to a [`FinalOutcome`].
    pub async fn run(&self, issue: &GithubIssue) -> Result<FinalOutcome, TriageError> {
        let mut conversation =
            Conversation::new(&self.config.system_prompt, render_issue_details(issue));
        let mut candidate: Option<Classification> = None;
        let mut step = ProtocolStep::IssueOnly;
        let mut directive = TransitionDirective::Proceed;

        for _ in 0..MAX_TURNS {
            if let TransitionDirective::WaitThenProceed(delay) = directive {
                tracing::info!(
                    delay_ms = delay.as_millis() as u64,
                    turn = step.turn_number(),
                    "waiting before next turn"
                );
                self.delay.wait(delay).await;
            }

            tracing::info!(
                issue_number = issue.number,
                turn = step.turn_number(),
                max_turns = MAX_TURNS,
                step = step.as_str(),
                "starting triage turn"
            );
            let response = self.send_turn(&conversation).await?;
            let raw = response.message.content.trim().to_string();
            let decoded = decode_turn(&raw);
            if decoded.classification.is_some() {
                candidate = decoded.classification;
            }
            tracing::info!(
                turn = step.turn_number(),
                payload = decoded.payload_kind(),
                classification = candidate.map(Classification::as_str).unwrap_or("none"),
                finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
                total_tokens = response.usage.total_tokens,
                "decoded model reply"
            );
            if response.finish_reason.as_deref() == Some("length") {
                tracing::warn!(
                    turn = step.turn_number(),
                    output_tokens = response.usage.output_tokens,
                    "model reply was cut at the token limit"
                );
            }
            if step == ProtocolStep::FinalBatch && !decoded.requested_files().is_empty() {
                tracing::warn!(
                    ignored_files = decoded.requested_files().len(),
                    "ignoring file requests in final turn"
                );
            }

            match decide(step, &decoded, self.config.turn_delay) {
                StepDecision::Finish(resolution) => {
                    if let Resolution::Fallback(reason) = &resolution {
                        if *reason == FallbackReason::ProtocolViolation {
                            tracing::warn!(
                                step = step.as_str(),
                                "model returned a response and file requests together"
                            );
                        }
                        tracing::info!(reason = reason.as_str(), "using fallback response");
                    }
                    return Ok(resolution.into_outcome(candidate));
                }
                StepDecision::Advance {
                    next,
                    requested_files,
                    directive: next_directive,
                } => {
                    let files: Vec<FileContent> = requested_files
                        .iter()
                        .map(|path| self.guard.read(path))
                        .collect();
                    conversation.push(Message::assistant_text(raw));
                    conversation.push(Message::user(render_file_contents(&files)));
                    step = next;
                    directive = next_directive;
                }
            }
        }

        Err(TriageError::NoResponse { turns: MAX_TURNS })
    }

    async fn send_turn(&self, conversation: &Conversation) -> Result<ChatResponse, TriageError> {
        let response = self
            .client
            .complete(ChatRequest {
                model: self.config.model.clone(),
                messages: conversation.messages().to_vec(),
                json_mode: true,
            })
            .await?;
        Ok(response)
    }
}
