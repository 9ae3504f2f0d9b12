pub mod answer;
pub mod classifier;
pub mod extractor;
pub mod groq;
pub mod ollama;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ConversationTurn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Decoding constraints for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_output: bool,
}

impl GenerationOptions {
    pub fn label(max_tokens: u32) -> Self {
        Self {
            temperature: 0.0,
            max_tokens,
            json_output: false,
        }
    }

    pub fn json(max_tokens: u32) -> Self {
        Self {
            temperature: 0.0,
            max_tokens,
            json_output: true,
        }
    }

    pub fn text(max_tokens: u32) -> Self {
        Self {
            temperature: 0.2,
            max_tokens,
            json_output: false,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> anyhow::Result<String>;
}

/// Chat payload with the system prompt prepended, in the role/content shape
/// both backends accept.
fn wire_messages(system_prompt: &str, messages: &[Message]) -> Vec<serde_json::Value> {
    std::iter::once(serde_json::json!({ "role": "system", "content": system_prompt }))
        .chain(
            messages
                .iter()
                .map(|m| serde_json::json!({ "role": m.role, "content": m.content })),
        )
        .collect()
}

/// Reads a JSON reply body and pulls the generated text from `pointer`.
async fn read_reply(
    backend: &str,
    resp: reqwest::Response,
    pointer: &str,
) -> anyhow::Result<String> {
    let status = resp.status();
    let data: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("failed to parse {backend} response: {e}"))?;

    if !status.is_success() {
        anyhow::bail!("{backend} API error ({status}): {data}");
    }

    data.pointer(pointer)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("missing content in {backend} response"))
}

/// Runs one model call under a deadline. A timed-out call is dropped, which
/// cancels the in-flight HTTP request.
pub async fn complete(
    llm: &dyn LlmProvider,
    system_prompt: &str,
    messages: &[Message],
    options: &GenerationOptions,
    timeout: Duration,
) -> anyhow::Result<String> {
    match tokio::time::timeout(timeout, llm.chat(system_prompt, messages, options)).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("model call timed out after {}s", timeout.as_secs_f32()),
    }
}

/// Builds the message list for a model call: the last `window` prior turns
/// followed by the current user message.
pub fn with_history(history: &[ConversationTurn], window: usize, latest: &str) -> Vec<Message> {
    let start = history.len().saturating_sub(window);
    let mut messages: Vec<Message> = history[start..].iter().map(Message::from).collect();
    messages.push(Message {
        role: "user".to_string(),
        content: latest.to_string(),
    });
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl LlmProvider for Stalled {
        async fn chat(
            &self,
            _system_prompt: &str,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let err = complete(
            &Stalled,
            "system",
            &[],
            &GenerationOptions::label(8),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_with_history_keeps_latest_window() {
        let history = vec![
            ConversationTurn::user("one"),
            ConversationTurn::assistant("two"),
            ConversationTurn::user("three"),
        ];
        let messages = with_history(&history, 2, "four");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three", "four"]);
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn test_wire_messages_prepends_system_prompt() {
        let wire = wire_messages(
            "be brief",
            &[Message {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        );
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "be brief");
        assert_eq!(wire[1]["role"], "user");
    }
}
