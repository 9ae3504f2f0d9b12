use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token budget preset for the final answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptLength {
    Short,
    Medium,
    Long,
}

impl PromptLength {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "short" => PromptLength::Short,
            "long" => PromptLength::Long,
            _ => PromptLength::Medium,
        }
    }

    pub fn max_answer_tokens(&self) -> u32 {
        match self {
            PromptLength::Short => 64,
            PromptLength::Medium => 96,
            PromptLength::Long => 192,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub session_secret: String,
    pub llm_provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub prompt_length: PromptLength,
    pub llm_timeout_secs: u64,
    pub history_window: usize,
    pub recent_orders_limit: usize,
    pub session_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "data/orders.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_default(),
            session_secret: env::var("SESSION_SECRET").unwrap_or_default(),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "phi3:mini".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            prompt_length: env::var("PROMPT_LENGTH")
                .map(|v| PromptLength::parse(&v))
                .unwrap_or(PromptLength::Medium),
            llm_timeout_secs: parsed("LLM_TIMEOUT_SECS", 30),
            history_window: parsed("HISTORY_WINDOW", 6),
            recent_orders_limit: parsed("RECENT_ORDERS_LIMIT", 5),
            session_ttl_minutes: parsed("SESSION_TTL_MINUTES", 30),
        }
    }

    /// Customer tokens are signed with `session_secret` and the admin token
    /// can mint them, so neither may be a well-known value.
    pub fn check_secrets(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.session_secret.trim().is_empty(),
            "SESSION_SECRET must be set"
        );
        for (name, value) in [
            ("SESSION_SECRET", &self.session_secret),
            ("ADMIN_TOKEN", &self.admin_token),
        ] {
            anyhow::ensure!(
                !WELL_KNOWN_SECRETS.contains(&value.trim()),
                "{name} is set to a well-known placeholder value"
            );
        }
        Ok(())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

const WELL_KNOWN_SECRETS: &[&str] = &["changeme", "secret", "password", "admin"];

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_length_parse() {
        assert_eq!(PromptLength::parse("SHORT"), PromptLength::Short);
        assert_eq!(PromptLength::parse(" long "), PromptLength::Long);
        assert_eq!(PromptLength::parse("whatever"), PromptLength::Medium);
    }

    fn config(session_secret: &str, admin_token: &str) -> AppConfig {
        AppConfig {
            port: 3000,
            database_url: ":memory:".to_string(),
            admin_token: admin_token.to_string(),
            session_secret: session_secret.to_string(),
            llm_provider: "ollama".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "phi3:mini".to_string(),
            groq_api_key: String::new(),
            groq_model: String::new(),
            prompt_length: PromptLength::Medium,
            llm_timeout_secs: 30,
            history_window: 6,
            recent_orders_limit: 5,
            session_ttl_minutes: 30,
        }
    }

    #[test]
    fn test_check_secrets() {
        assert!(config("k3y-from-vault-9f2c", "ops-7d1e").check_secrets().is_ok());
        // Admin routes are simply disabled without a token.
        assert!(config("k3y-from-vault-9f2c", "").check_secrets().is_ok());

        assert!(config("", "ops-7d1e").check_secrets().is_err());
        assert!(config("   ", "ops-7d1e").check_secrets().is_err());
        let err = config("changeme", "ops-7d1e").check_secrets().unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
        let err = config("k3y-from-vault-9f2c", "changeme").check_secrets().unwrap_err();
        assert!(err.to_string().contains("ADMIN_TOKEN"));
    }

    #[test]
    fn test_answer_budgets_grow() {
        assert!(PromptLength::Short.max_answer_tokens() < PromptLength::Medium.max_answer_tokens());
        assert!(PromptLength::Medium.max_answer_tokens() < PromptLength::Long.max_answer_tokens());
        assert_eq!(PromptLength::Medium.max_answer_tokens(), 96);
    }
}
