use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::conversation::SupportPipeline;
use crate::services::handoff::HandoffQueue;
use crate::services::session::SessionStore;
use crate::services::store::OrderStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn OrderStore>,
    pub pipeline: SupportPipeline,
    pub sessions: SessionStore,
    pub handoffs: HandoffQueue,
}
