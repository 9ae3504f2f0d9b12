use serde::{Deserialize, Serialize};

use super::Intent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Answered,
    NotFound,
    Clarify,
    HandedOff,
    Redirected,
    Refused,
    Unavailable,
}

/// What the caller gets back for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportReply {
    pub text: String,
    pub transferred_to_human: bool,
    pub intent: Option<Intent>,
    pub outcome: Outcome,
}

impl SupportReply {
    pub fn new(text: impl Into<String>, intent: Option<Intent>, outcome: Outcome) -> Self {
        Self {
            text: text.into(),
            transferred_to_human: outcome == Outcome::HandedOff,
            intent,
            outcome,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.outcome == Outcome::Unavailable
    }
}
