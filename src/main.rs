use std::sync::{Arc, Mutex};

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use orderdesk::config::AppConfig;
use orderdesk::db;
use orderdesk::handlers;
use orderdesk::services::ai::groq::GroqProvider;
use orderdesk::services::ai::ollama::OllamaProvider;
use orderdesk::services::ai::LlmProvider;
use orderdesk::services::conversation::{PipelineSettings, SupportPipeline};
use orderdesk::services::handoff::HandoffQueue;
use orderdesk::services::session::SessionStore;
use orderdesk::services::store::{OrderStore, SqliteOrderStore};
use orderdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    config.check_secrets()?;
    if config.admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN not set, admin and agent routes are disabled");
    }

    let conn = db::init_db(&config.database_url)?;
    let store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(Arc::new(Mutex::new(conn))));

    let llm: Arc<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(!config.groq_api_key.is_empty(), "GROQ_API_KEY must be set when LLM_PROVIDER=groq");
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Arc::new(GroqProvider::new(config.groq_api_key.clone(), config.groq_model.clone()))
        }
        _ => {
            tracing::info!(
                "using Ollama LLM provider (url: {}, model: {})",
                config.ollama_url,
                config.ollama_model
            );
            Arc::new(OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone()))
        }
    };

    let settings = PipelineSettings::from_config(&config);
    tracing::info!(
        prompt_length = ?config.prompt_length,
        timeout_secs = config.llm_timeout_secs,
        "pipeline configured"
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::clone(&store),
        pipeline: SupportPipeline::new(llm, store, settings),
        sessions: SessionStore::new(config.session_ttl_minutes),
        handoffs: HandoffQueue::new(),
    });

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
