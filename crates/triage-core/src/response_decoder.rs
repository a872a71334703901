use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::classification::{extract_classification_from_text, Classification};

/// Per-turn cap on file requests honored from one model reply.
pub const MAX_REQUESTED_FILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Shape of one decoded model reply. The controller matches on this and
/// never looks at raw JSON.
pub enum TurnPayload {
    NeedsFiles(Vec<String>),
    FinalResponse(String),
    /// Both a response and file requests; which one wins depends on the step.
    Conflicting {
        response: String,
        requested_files: Vec<String>,
    },
    /// Valid JSON with neither a usable response nor file requests.
    Empty,
    /// Not JSON. Carries the raw reply, which stands in as the response.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTurn {
    pub classification: Option<Classification>,
    pub payload: TurnPayload,
}

impl DecodedTurn {
    pub fn response(&self) -> Option<&str> {
        match &self.payload {
            TurnPayload::FinalResponse(response)
            | TurnPayload::Conflicting { response, .. }
            | TurnPayload::Malformed(response) => Some(response),
            TurnPayload::NeedsFiles(_) | TurnPayload::Empty => None,
        }
    }

    pub fn requested_files(&self) -> &[String] {
        match &self.payload {
            TurnPayload::NeedsFiles(files)
            | TurnPayload::Conflicting {
                requested_files: files,
                ..
            } => files.as_slice(),
            TurnPayload::FinalResponse(_) | TurnPayload::Empty | TurnPayload::Malformed(_) => &[],
        }
    }

    pub fn payload_kind(&self) -> &'static str {
        match self.payload {
            TurnPayload::NeedsFiles(_) => "needs_files",
            TurnPayload::FinalResponse(_) => "final_response",
            TurnPayload::Conflicting { .. } => "conflicting",
            TurnPayload::Empty => "empty",
            TurnPayload::Malformed(_) => "malformed",
        }
    }
}

fn json_fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^```(?i:json)?\s*\n?(.*?)\n?```\s*$").expect("valid regex")
    })
}

/// Removes one fenced block wrapping the whole reply, if present.
fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    json_fence_pattern()
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str().trim())
        .unwrap_or(trimmed)
}

/// Maps one raw assistant reply to a [`DecodedTurn`]. Total and pure.
pub fn decode_turn(raw: &str) -> DecodedTurn {
    let parsed = match serde_json::from_str::<Value>(strip_json_fence(raw)) {
        Ok(parsed) => parsed,
        Err(_) => {
            return DecodedTurn {
                classification: extract_classification_from_text(raw),
                payload: TurnPayload::Malformed(raw.to_string()),
            };
        }
    };

    let response = parsed
        .get("response")
        .and_then(Value::as_str)
        .filter(|response| !response.trim().is_empty())
        .map(ToOwned::to_owned);
    let requested_files = parsed
        .get("requested_files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .take(MAX_REQUESTED_FILES)
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let classification = parsed
        .get("classification")
        .and_then(Value::as_str)
        .and_then(Classification::parse)
        .or_else(|| extract_classification_from_text(raw));

    let payload = match (response, requested_files.is_empty()) {
        (Some(response), true) => TurnPayload::FinalResponse(response),
        (Some(response), false) => TurnPayload::Conflicting {
            response,
            requested_files,
        },
        (None, false) => TurnPayload::NeedsFiles(requested_files),
        (None, true) => TurnPayload::Empty,
    };
    DecodedTurn {
        classification,
        payload,
    }
}
