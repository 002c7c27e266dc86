//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::context::ContextLoadError;
use crate::conversation::{Message, SystemInstruction};
use crate::llm::{GenerationError, GenerationRequest, GenerationService};
use crate::site::{SiteClient, SiteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Source of the system instruction
#[async_trait]
pub trait ContextLoader: Send + Sync {
    async fn load(&self) -> Result<SystemInstruction, ContextLoadError>;
}

/// Client for the text-generation service
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a reply to `history`. An empty string is a valid reply.
    async fn generate(
        &self,
        history: &[Message],
        instruction: &SystemInstruction,
    ) -> Result<String, GenerationError>;
}

/// Best-effort transcript sink
#[async_trait]
pub trait TranscriptLogger: Send + Sync {
    async fn log(&self, messages: &[Message], timestamp: DateTime<Utc>) -> Result<(), LogError>;
}

/// Transcript logging failed. Diagnostic only.
#[derive(Debug, Error)]
#[error("transcript log failed: {message}")]
pub struct LogError {
    pub message: String,
}

impl From<SiteError> for LogError {
    fn from(e: SiteError) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ContextLoader + ?Sized> ContextLoader for Arc<T> {
    async fn load(&self) -> Result<SystemInstruction, ContextLoadError> {
        (**self).load().await
    }
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn generate(
        &self,
        history: &[Message],
        instruction: &SystemInstruction,
    ) -> Result<String, GenerationError> {
        (**self).generate(history, instruction).await
    }
}

#[async_trait]
impl<T: TranscriptLogger + ?Sized> TranscriptLogger for Arc<T> {
    async fn log(&self, messages: &[Message], timestamp: DateTime<Utc>) -> Result<(), LogError> {
        (**self).log(messages, timestamp).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use a `GenerationService` as `GenerationClient`
///
/// Builds the prompt payload and bounds the call with a deadline.
pub struct ServiceGenerationClient {
    service: Arc<dyn GenerationService>,
    timeout: Duration,
}

impl ServiceGenerationClient {
    pub fn new(service: Arc<dyn GenerationService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }
}

#[async_trait]
impl GenerationClient for ServiceGenerationClient {
    async fn generate(
        &self,
        history: &[Message],
        instruction: &SystemInstruction,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest::new(history, instruction);
        match tokio::time::timeout(self.timeout, self.service.generate(&request)).await {
            Ok(result) => result.map(|response| response.text),
            Err(_) => Err(GenerationError::timeout(format!(
                "Request timed out after {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

/// Adapter to use the site's log endpoint as `TranscriptLogger`
pub struct SiteTranscriptLogger {
    site: SiteClient,
}

impl SiteTranscriptLogger {
    pub fn new(site: SiteClient) -> Self {
        Self { site }
    }
}

#[async_trait]
impl TranscriptLogger for SiteTranscriptLogger {
    async fn log(&self, messages: &[Message], timestamp: DateTime<Utc>) -> Result<(), LogError> {
        self.site.log_chat(messages, timestamp).await?;
        Ok(())
    }
}
