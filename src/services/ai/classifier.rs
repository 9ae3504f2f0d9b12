use std::time::Duration;

use crate::errors::PipelineError;
use crate::models::{ConversationTurn, Intent};
use crate::services::ai::prompt::{self, CLASSIFY_TEMPLATE};
use crate::services::ai::{complete, with_history, GenerationOptions, LlmProvider};

const LABEL_TOKENS: u32 = 8;

/// Maps the latest message to one intent label.
///
/// Output that is not exactly one label falls back to `OutOfScope`, which
/// never touches the order store. Transport failures are returned so the
/// caller can apologise instead of guessing.
pub async fn classify_intent(
    llm: &dyn LlmProvider,
    history: &[ConversationTurn],
    message: &str,
    history_window: usize,
    timeout: Duration,
) -> Result<Intent, PipelineError> {
    let labels = Intent::ALL
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let system = prompt::render(CLASSIFY_TEMPLATE, &[("labels", labels.as_str())])
        .map_err(|e| PipelineError::ModelUnavailable(e.to_string()))?;

    let messages = with_history(history, history_window, message);
    let raw = complete(
        llm,
        &system,
        &messages,
        &GenerationOptions::label(LABEL_TOKENS),
        timeout,
    )
    .await
    .map_err(|e| PipelineError::ModelUnavailable(format!("{e:#}")))?;

    match parse_intent_label(&raw) {
        Ok(intent) => Ok(intent),
        Err(e) => {
            tracing::warn!(error = %e, "classifier output rejected, defaulting to OUT_OF_SCOPE");
            Ok(Intent::OutOfScope)
        }
    }
}

pub fn parse_intent_label(raw: &str) -> Result<Intent, PipelineError> {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(intent) = value["intent"].as_str().and_then(|s| Intent::from_label(s.trim())) {
                return Ok(intent);
            }
        }
        return Err(PipelineError::ClassificationParse(raw.to_string()));
    }

    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .to_ascii_uppercase();

    Intent::from_label(&first).ok_or_else(|| PipelineError::ClassificationParse(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_label() {
        assert_eq!(parse_intent_label("ORDER_INFO").unwrap(), Intent::OrderInfo);
        assert_eq!(parse_intent_label("  order_help\n").unwrap(), Intent::OrderHelp);
    }

    #[test]
    fn test_parse_label_with_decoration() {
        assert_eq!(parse_intent_label("**OUT_OF_SCOPE**").unwrap(), Intent::OutOfScope);
        assert_eq!(parse_intent_label("\"ORDER_INFO\".").unwrap(), Intent::OrderInfo);
        assert_eq!(
            parse_intent_label("ORDER_INFO because they ask about delivery").unwrap(),
            Intent::OrderInfo
        );
    }

    #[test]
    fn test_parse_json_label() {
        assert_eq!(parse_intent_label(r#"{"intent": "ORDER_HELP"}"#).unwrap(), Intent::OrderHelp);
        assert!(parse_intent_label(r#"{"intent": "REFUND"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_near_misses() {
        assert!(parse_intent_label("ORDER").is_err());
        assert!(parse_intent_label("The intent is ORDER_INFO").is_err());
        assert!(parse_intent_label("").is_err());
    }
}
