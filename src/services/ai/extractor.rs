use std::time::Duration;

use serde::Deserialize;

use crate::errors::PipelineError;
use crate::models::{ConversationTurn, ExtractionResult, OrderReference, OrderSummary, Role};
use crate::services::ai::prompt::{self, EXTRACT_TEMPLATE};
use crate::services::ai::{complete, with_history, GenerationOptions, LlmProvider};

const EXTRACTION_TOKENS: u32 = 64;

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    target_order_id: Option<serde_json::Value>,
    #[serde(default)]
    wants_latest: Option<bool>,
    #[serde(default)]
    needs_clarification: Option<bool>,
}

/// Works out which of the caller's orders the message refers to.
///
/// The model's answer is only trusted after validation: an explicit id must
/// appear in something the customer wrote or in their own order history, and
/// anything unclear becomes a clarification request.
pub async fn extract_order_reference(
    llm: &dyn LlmProvider,
    history: &[ConversationTurn],
    message: &str,
    recent_orders: &[OrderSummary],
    history_window: usize,
    timeout: Duration,
) -> Result<ExtractionResult, PipelineError> {
    let orders = if recent_orders.is_empty() {
        "(no orders on file)".to_string()
    } else {
        recent_orders
            .iter()
            .map(OrderSummary::to_prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    };
    let system = prompt::render(EXTRACT_TEMPLATE, &[("orders", orders.as_str())])
        .map_err(|e| PipelineError::ModelUnavailable(e.to_string()))?;

    let messages = with_history(history, history_window, message);
    let raw = complete(
        llm,
        &system,
        &messages,
        &GenerationOptions::json(EXTRACTION_TOKENS),
        timeout,
    )
    .await
    .map_err(|e| PipelineError::ModelUnavailable(format!("{e:#}")))?;

    let result = match parse_extraction(&raw) {
        Some(parsed) => validate(parsed, &customer_numbers(message, history), recent_orders),
        None => {
            tracing::warn!("failed to parse extractor output, asking for clarification");
            ExtractionResult::clarify()
        }
    };

    Ok(result)
}

fn parse_extraction(response: &str) -> Option<RawExtraction> {
    if let Ok(parsed) = serde_json::from_str::<RawExtraction>(response) {
        return Some(parsed);
    }

    let cleaned = response
        .trim()
        .strip_prefix("```json")
        .or_else(|| response.trim().strip_prefix("```"))
        .unwrap_or(response.trim());
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(parsed) = serde_json::from_str::<RawExtraction>(cleaned) {
        return Some(parsed);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<RawExtraction>(&cleaned[start..=end]).ok()
}

fn order_id_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

/// Numbers the customer wrote, in this message or an earlier user turn.
fn customer_numbers(message: &str, history: &[ConversationTurn]) -> Vec<i64> {
    let mut numbers = mentioned_numbers(message);
    numbers.extend(
        history
            .iter()
            .filter(|turn| turn.role == Role::User)
            .flat_map(|turn| mentioned_numbers(&turn.content)),
    );
    numbers
}

fn validate(raw: RawExtraction, mentioned: &[i64], recent_orders: &[OrderSummary]) -> ExtractionResult {
    if raw.needs_clarification.unwrap_or(true) {
        return ExtractionResult::clarify();
    }

    if let Some(id) = raw.target_order_id.as_ref().and_then(order_id_value) {
        let in_conversation = mentioned.contains(&id);
        let in_orders = recent_orders.iter().any(|o| o.order_id == id);
        if in_conversation || in_orders {
            return ExtractionResult::resolved(OrderReference::Id(id));
        }
        tracing::warn!(order_id = id, "extractor proposed an untraceable order id, discarding");
        return ExtractionResult::clarify();
    }

    if raw.wants_latest.unwrap_or(false) {
        return match recent_orders {
            [] => ExtractionResult::clarify(),
            [newest, second, ..] if newest.date_purchase == second.date_purchase => {
                tracing::debug!("two orders share the latest purchase time, asking for clarification");
                ExtractionResult::clarify()
            }
            _ => ExtractionResult::resolved(OrderReference::Latest),
        };
    }

    ExtractionResult::clarify()
}

/// Every run of ASCII digits in the text, parsed as a number.
pub fn mentioned_numbers(text: &str) -> Vec<i64> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .filter_map(|run| run.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<OrderSummary> {
        vec![
            OrderSummary {
                order_id: 7,
                status: "invoiced".to_string(),
                date_purchase: "2024-06-01 08:00:00".to_string(),
            },
            OrderSummary {
                order_id: 5,
                status: "delivered".to_string(),
                date_purchase: "2024-05-17 11:01:51".to_string(),
            },
            OrderSummary {
                order_id: 3,
                status: "shipped".to_string(),
                date_purchase: "2024-04-02 10:00:00".to_string(),
            },
        ]
    }

    fn run(raw: &str, message: &str, orders: &[OrderSummary]) -> ExtractionResult {
        match parse_extraction(raw) {
            Some(parsed) => validate(parsed, &mentioned_numbers(message), orders),
            None => ExtractionResult::clarify(),
        }
    }

    #[test]
    fn test_explicit_id_from_message() {
        let result = run(
            r#"{"target_order_id": 1001, "wants_latest": false, "needs_clarification": false}"#,
            "Where is my order #1001?",
            &history(),
        );
        assert_eq!(result.order_id(), Some(1001));
        assert!(!result.needs_clarification);
    }

    #[test]
    fn test_id_from_history() {
        let result = run(
            r#"{"target_order_id": 5, "wants_latest": false, "needs_clarification": false}"#,
            "What about the one that was delivered?",
            &history(),
        );
        assert_eq!(result.order_id(), Some(5));
    }

    #[test]
    fn test_fabricated_id_is_discarded() {
        let result = run(
            r#"{"target_order_id": 4242, "wants_latest": false, "needs_clarification": false}"#,
            "Where is my package?",
            &history(),
        );
        assert_eq!(result, ExtractionResult::clarify());
    }

    #[test]
    fn test_id_from_earlier_customer_turn() {
        let history = vec![
            ConversationTurn::user("Where is my order #1001?"),
            ConversationTurn::assistant("Order #1001 is shipped. Anything about #2002?"),
        ];
        let numbers = customer_numbers("and was it paid?", &history);
        assert_eq!(numbers, vec![1001]);

        let raw = parse_extraction(
            r#"{"target_order_id": 1001, "wants_latest": false, "needs_clarification": false}"#,
        )
        .unwrap();
        assert_eq!(validate(raw, &numbers, &[]).order_id(), Some(1001));

        let raw = parse_extraction(
            r#"{"target_order_id": 2002, "wants_latest": false, "needs_clarification": false}"#,
        )
        .unwrap();
        assert!(validate(raw, &numbers, &[]).needs_clarification);
    }

    #[test]
    fn test_string_id_accepted() {
        let result = run(
            r##"{"target_order_id": "#3", "needs_clarification": false}"##,
            "status of 3 please",
            &history(),
        );
        assert_eq!(result.order_id(), Some(3));
    }

    #[test]
    fn test_latest_order() {
        let result = run(
            "```json\n{\"target_order_id\": null, \"wants_latest\": true, \"needs_clarification\": false}\n```",
            "What is the status of my last order?",
            &history(),
        );
        assert_eq!(result, ExtractionResult::resolved(OrderReference::Latest));
    }

    #[test]
    fn test_latest_with_tie_needs_clarification() {
        let mut orders = history();
        orders[1].date_purchase = orders[0].date_purchase.clone();
        let result = run(
            r#"{"target_order_id": null, "wants_latest": true, "needs_clarification": false}"#,
            "my latest order?",
            &orders,
        );
        assert!(result.needs_clarification);
    }

    #[test]
    fn test_latest_without_orders_needs_clarification() {
        let result = run(
            r#"{"target_order_id": null, "wants_latest": true, "needs_clarification": false}"#,
            "my latest order?",
            &[],
        );
        assert!(result.needs_clarification);
    }

    #[test]
    fn test_model_asks_for_clarification() {
        let result = run(
            r#"{"target_order_id": 5, "wants_latest": false, "needs_clarification": true}"#,
            "What about my order?",
            &history(),
        );
        assert_eq!(result, ExtractionResult::clarify());
    }

    #[test]
    fn test_prose_around_json() {
        let result = run(
            r#"Sure! {"target_order_id": 7, "needs_clarification": false} Hope that helps."#,
            "order 7",
            &history(),
        );
        assert_eq!(result.order_id(), Some(7));
    }

    #[test]
    fn test_unparseable_output_clarifies() {
        let result = run("I am not sure which order.", "What about my order?", &history());
        assert_eq!(result, ExtractionResult::clarify());
    }

    #[test]
    fn test_missing_flag_clarifies() {
        let result = run(r#"{"target_order_id": 5}"#, "order 5", &history());
        assert!(result.needs_clarification);
    }

    #[test]
    fn test_mentioned_numbers() {
        assert_eq!(mentioned_numbers("order #1001 and 12, not x"), vec![1001, 12]);
        assert!(mentioned_numbers("no digits").is_empty());
    }
}
