//! Chat widget - a terminal chat assistant primed by a site's agent context
//!
//! Composition root: wires the site client, the Gemini service and the
//! terminal UI around the conversation runtime.

mod config;
mod context;
mod conversation;
mod llm;
mod runtime;
mod site;
mod state_machine;
mod ui;

use config::WidgetConfig;
use context::SiteContextLoader;
use llm::{GeminiService, GenerationService, LoggingService, UnconfiguredService};
use runtime::{ProductionRuntime, ServiceGenerationClient, SiteTranscriptLogger};
use site::SiteClient;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = WidgetConfig::from_env()?;
    init_logging(&config.log_path)?;

    tracing::info!(
        site = %config.site_url,
        model = %config.gemini_model,
        timeout_secs = config.generation_timeout.as_secs(),
        "Starting chat widget"
    );

    // Generation service
    let service: Arc<dyn GenerationService> = match &config.gemini_api_key {
        Some(key) => Arc::new(GeminiService::new(
            key.clone(),
            &config.gemini_model,
            &config.gemini_base_url,
        )?),
        None => {
            tracing::warn!("No Gemini API key configured. Set GEMINI_API_KEY.");
            Arc::new(UnconfiguredService)
        }
    };
    let generation = ServiceGenerationClient::new(
        Arc::new(LoggingService::new(service)),
        config.generation_timeout,
    );

    let site = SiteClient::new(&config.site_url)?;
    let (runtime, handle) = ProductionRuntime::new(
        SiteContextLoader::new(site.clone()),
        generation,
        SiteTranscriptLogger::new(site),
    );
    let runtime_task = tokio::spawn(runtime.run());

    let result = ui::run(handle.clone(), &config.assistant_name).await;

    tracing::info!(
        messages = handle.snapshot().messages.len(),
        "Chat widget closed"
    );
    handle.shutdown();
    if let Err(e) = runtime_task.await {
        tracing::error!(error = %e, "Runtime task failed");
    }
    result?;

    Ok(())
}

/// JSON logs go to a file; the terminal belongs to the UI
fn init_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_widget=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}
