use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{read_reply, wire_messages, GenerationOptions, LlmProvider, Message};

/// Local model served by Ollama's `/api/chat`.
pub struct OllamaProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> anyhow::Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(system_prompt, messages),
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            },
        });
        if options.json_output {
            body["format"] = json!("json");
        }

        let resp = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to reach Ollama at {}", self.url))?;

        read_reply("Ollama", resp, "/message/content").await
    }
}
