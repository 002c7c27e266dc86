//! Text-generation service abstraction
//!
//! The controller only sees a flattened history and a system instruction;
//! providers translate that into their own wire format.

mod error;
mod gemini;
mod types;


pub use error::{GenerationError, GenerationErrorKind};
pub use gemini::{GeminiService, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for generation providers
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Make a single completion request
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, GenerationError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for generation services
pub struct LoggingService {
    inner: Arc<dyn GenerationService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn GenerationService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl GenerationService for LoggingService {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = request.history_text.len(),
                    reply_chars = response.text.len(),
                    "Generation request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Generation request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Stand-in used when no API key is configured
pub struct UnconfiguredService;

#[async_trait]
impl GenerationService for UnconfiguredService {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        Err(GenerationError::unavailable("No Gemini model available."))
    }

    fn model_id(&self) -> &str {
        "unconfigured"
    }
}
