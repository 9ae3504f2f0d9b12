use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{read_reply, wire_messages, GenerationOptions, LlmProvider, Message};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Hosted model behind Groq's OpenAI-compatible endpoint.
pub struct GroqProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> anyhow::Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(system_prompt, messages),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if options.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Groq API")?;

        read_reply("Groq", resp, "/choices/0/message/content").await
    }
}
