//! Classroom API server.
//!
//! Reads [`Config`] from the environment, wires the chat-backed content
//! provider and the optional analytics client into [`AppState`], then serves
//! the REST + WebSocket router until `Ctrl+C`.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use classroom_api::{
    analytics::AzureTextAnalytics, config::Config, prompts::load_prompts, router::create_router,
    state::{AppState, vendor_http_client},
    store::SessionStore,
};
use classroom_core::{analytics::TextAnalytics, content::LLMContentProvider};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown requested, draining connections.");
}

fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let prompts = load_prompts(&config.prompts_path)?;
    let llm = OpenAIConfig::new()
        .with_api_key(
            config
                .provider_api_key()
                .context("No API key for the configured provider")?,
        )
        .with_api_base(config.provider.api_base());
    let content = Arc::new(LLMContentProvider::new(
        llm,
        config.chat_model.clone(),
        prompts,
    ));

    let http = vendor_http_client().context("Failed to build the HTTP client")?;
    let analytics: Option<Arc<dyn TextAnalytics>> = match &config.text_analytics {
        Some(ta) => {
            info!(endpoint = %ta.endpoint, "Text analytics enabled.");
            Some(Arc::new(AzureTextAnalytics::new(http.clone(), ta)))
        }
        None => None,
    };
    info!(
        premium_voices = config.elevenlabs_api_key.is_some(),
        "Narration backends configured."
    );

    Ok(Arc::new(AppState {
        store: Arc::new(SessionStore::new()),
        content,
        analytics,
        http,
        config: Arc::new(config),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let bind_address = config.bind_address;
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        %bind_address,
        "Starting classroom service."
    );
    let state = build_state(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Could not bind {bind_address}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped.");
    Ok(())
}
