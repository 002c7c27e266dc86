//! System instruction loading
//!
//! Tries the site's agent-context endpoint first and falls back to the static
//! prompt file. Runs once per mount; there is no retry loop.

use crate::conversation::SystemInstruction;
use crate::runtime::ContextLoader;
use crate::site::{SiteClient, SiteError};
use async_trait::async_trait;
use thiserror::Error;

/// Both context sources failed; the instruction stays unset
#[derive(Debug, Error)]
#[error("context unavailable (primary: {primary}; fallback: {fallback})")]
pub struct ContextLoadError {
    pub primary: SiteError,
    pub fallback: SiteError,
}

/// Loads the system instruction from the host site
pub struct SiteContextLoader {
    site: SiteClient,
}

impl SiteContextLoader {
    pub fn new(site: SiteClient) -> Self {
        Self { site }
    }
}

#[async_trait]
impl ContextLoader for SiteContextLoader {
    async fn load(&self) -> Result<SystemInstruction, ContextLoadError> {
        let primary = match self.site.agent_context().await {
            Ok(text) => {
                if let Some(instruction) = SystemInstruction::new(text) {
                    tracing::info!(source = "agent-context", "System instruction loaded");
                    return Ok(instruction);
                }
                SiteError::MissingField("systemInstruction")
            }
            Err(e) => e,
        };

        tracing::warn!(error = %primary, "Agent context unavailable, trying static prompt");

        match self.site.fallback_prompt().await {
            Ok(text) => match SystemInstruction::new(text) {
                Some(instruction) => {
                    tracing::info!(source = "system_prompt.json", "System instruction loaded");
                    Ok(instruction)
                }
                None => Err(ContextLoadError {
                    primary,
                    fallback: SiteError::MissingField("text"),
                }),
            },
            Err(fallback) => Err(ContextLoadError { primary, fallback }),
        }
    }
}
