//! Common types for generation requests

use crate::conversation::{Message, SystemInstruction};

/// Fixed sampling parameters. Deterministic-leaning, bounded output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 2048,
        }
    }
}

/// Generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Priming instruction, passed separately from the history
    pub system_instruction: String,
    /// Flattened conversation, see [`flatten_history`]
    pub history_text: String,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(history: &[Message], instruction: &SystemInstruction) -> Self {
        Self {
            system_instruction: instruction.as_str().to_string(),
            history_text: flatten_history(history),
            config: GenerationConfig::default(),
        }
    }
}

/// Generation response
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    /// Completion text; may be empty
    pub text: String,
}

/// One `"<Role>: <content>"` line per message, in conversation order
pub fn flatten_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|msg| format!("{}: {}", msg.role.prompt_label(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}
