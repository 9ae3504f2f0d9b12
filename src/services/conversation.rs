use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::PipelineError;
use crate::models::{ConversationTurn, Intent, OrderReference, Outcome, SupportReply};
use crate::services::ai::answer::{
    self, HANDOFF_REPLY, NOT_FOUND_REPLY, REDIRECT_REPLY, REFUSAL_REPLY, UNAVAILABLE_REPLY,
};
use crate::services::ai::classifier::classify_intent;
use crate::services::ai::extractor::extract_order_reference;
use crate::services::ai::LlmProvider;
use crate::services::guard;
use crate::services::store::OrderStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Classified,
    Extracting,
    SkipExtraction,
    Retrieved,
    Clarify,
    Denied,
    Answered,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub history_window: usize,
    pub recent_orders_limit: usize,
    pub answer_max_tokens: u32,
    pub model_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            history_window: config.history_window,
            recent_orders_limit: config.recent_orders_limit,
            answer_max_tokens: config.prompt_length.max_answer_tokens(),
            model_timeout: config.llm_timeout(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_window: 6,
            recent_orders_limit: 5,
            answer_max_tokens: 96,
            model_timeout: Duration::from_secs(30),
        }
    }
}

/// Classify, extract, retrieve, answer. One message at a time; the pipeline
/// holds no per-conversation state of its own.
pub struct SupportPipeline {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn OrderStore>,
    settings: PipelineSettings,
}

impl SupportPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn OrderStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            llm,
            store,
            settings,
        }
    }

    pub async fn handle_message(
        &self,
        user_id: i64,
        message: &str,
        history: &[ConversationTurn],
    ) -> SupportReply {
        advance(user_id, Stage::Received);

        let clean = match guard::sanitize_input(message) {
            Ok(clean) => clean,
            Err(e) => return self.fail(user_id, None, e.into()),
        };
        let history: Vec<ConversationTurn> = history
            .iter()
            .map(|turn| ConversationTurn {
                content: guard::neutralize(&turn.content),
                ..turn.clone()
            })
            .collect();

        let intent = match classify_intent(
            self.llm.as_ref(),
            &history,
            &clean,
            self.settings.history_window,
            self.settings.model_timeout,
        )
        .await
        {
            Ok(intent) => intent,
            Err(e) => return self.fail(user_id, None, e),
        };

        tracing::info!(user_id, intent = intent.as_str(), "classified message");
        advance(user_id, Stage::Classified);

        let reply = match intent {
            Intent::OrderHelp => {
                advance(user_id, Stage::SkipExtraction);
                SupportReply::new(HANDOFF_REPLY, Some(intent), Outcome::HandedOff)
            }
            Intent::OutOfScope => {
                advance(user_id, Stage::SkipExtraction);
                SupportReply::new(REDIRECT_REPLY, Some(intent), Outcome::Redirected)
            }
            Intent::OrderInfo => match self.answer_order_info(user_id, &clean, &history).await {
                Ok(reply) => reply,
                Err(e) => return self.fail(user_id, Some(intent), e),
            },
        };

        advance(user_id, Stage::Answered);
        reply
    }

    async fn answer_order_info(
        &self,
        user_id: i64,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<SupportReply, PipelineError> {
        let intent = Some(Intent::OrderInfo);

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(PipelineError::UnknownUser(user_id))?;

        advance(user_id, Stage::Extracting);
        let recent = self
            .store
            .recent_orders(user_id, self.settings.recent_orders_limit)
            .await?;

        let extraction = extract_order_reference(
            self.llm.as_ref(),
            history,
            message,
            &recent,
            self.settings.history_window,
            self.settings.model_timeout,
        )
        .await?;

        let reference = match extraction.order {
            Some(reference) if !extraction.needs_clarification => reference,
            _ => {
                advance(user_id, Stage::Clarify);
                return Ok(SupportReply::new(
                    answer::clarification_reply(&user.first_name, &recent),
                    intent,
                    Outcome::Clarify,
                ));
            }
        };

        let found = match reference {
            OrderReference::Id(order_id) => self.store.get_order(user_id, order_id).await?,
            OrderReference::Latest => self.store.get_last_order(user_id).await?,
        };

        let Some(order) = found else {
            advance(user_id, Stage::Denied);
            tracing::info!(user_id, reference = ?reference, "order not found for caller");
            return Ok(SupportReply::new(NOT_FOUND_REPLY, intent, Outcome::NotFound));
        };
        guard::verify_order_ownership(user_id, &order)?;

        advance(user_id, Stage::Retrieved);
        let text = answer::generate_order_answer(
            self.llm.as_ref(),
            &user,
            message,
            &order,
            self.settings.answer_max_tokens,
            self.settings.model_timeout,
        )
        .await;

        Ok(SupportReply::new(text, intent, Outcome::Answered))
    }

    fn fail(&self, user_id: i64, intent: Option<Intent>, error: PipelineError) -> SupportReply {
        match &error {
            PipelineError::SanitizationRejected(e) => {
                tracing::warn!(target: "audit", user_id, reason = e.reason, "message rejected by sanitizer");
                SupportReply::new(REFUSAL_REPLY, intent, Outcome::Refused)
            }
            PipelineError::UnknownUser(_) => {
                tracing::warn!(target: "audit", user_id, "request for unknown user");
                SupportReply::new(REFUSAL_REPLY, intent, Outcome::Refused)
            }
            PipelineError::AccessDenied(denied) => {
                advance(user_id, Stage::Denied);
                tracing::warn!(
                    target: "audit",
                    user_id,
                    order_id = denied.order_id,
                    "store returned an order owned by another user"
                );
                SupportReply::new(NOT_FOUND_REPLY, intent, Outcome::NotFound)
            }
            PipelineError::ClassificationParse(_) => {
                SupportReply::new(REDIRECT_REPLY, Some(Intent::OutOfScope), Outcome::Redirected)
            }
            PipelineError::StoreUnavailable(_) | PipelineError::ModelUnavailable(_) => {
                tracing::error!(user_id, error = %error, "pipeline aborted");
                SupportReply::new(UNAVAILABLE_REPLY, intent, Outcome::Unavailable)
            }
        }
    }
}

fn advance(user_id: i64, stage: Stage) {
    tracing::debug!(user_id, stage = ?stage, "pipeline stage");
}
