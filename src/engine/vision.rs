//! Multimodal-LLM transcription.

use super::TranscriptionEngine;
use crate::config::ExtractionConfig;
use crate::pipeline::encode::to_image_data;
use crate::pipeline::normalize::NormalizedImage;
use crate::pipeline::postprocess::strip_code_fences;
use crate::prompts::{DEFAULT_TRANSCRIPTION_PROMPT, TRANSCRIPTION_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Transcribes a page image through an `edgequake_llm` vision provider.
///
/// ## Message Layout
///
/// 1. **System message**: transcription rules (ignore headers, ruling and
///    margins; keep paragraphs; no commentary).
/// 2. **User message**: the instruction plus the image as a base64 attachment.
///
/// The call is attempted once. A provider error is logged and yields `""`,
/// which sends the orchestrator to the fallback engine.
pub struct VisionEngine {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    temperature: f32,
    max_tokens: usize,
}

impl VisionEngine {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            prompt: DEFAULT_TRANSCRIPTION_PROMPT.to_string(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    /// Take prompt and completion options from `config`.
    pub fn with_config(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            prompt: instruction_for(config),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_messages(&self, image: &NormalizedImage) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(TRANSCRIPTION_SYSTEM_PROMPT),
            ChatMessage::user_with_images(&self.prompt, vec![to_image_data(image)]),
        ]
    }
}

fn instruction_for(config: &ExtractionConfig) -> String {
    config
        .transcription_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_PROMPT.to_string())
}

fn completion_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl TranscriptionEngine for VisionEngine {
    fn name(&self) -> &str {
        "vision"
    }

    async fn transcribe(&self, image: &NormalizedImage) -> String {
        let start = Instant::now();
        let messages = self.build_messages(image);
        let options = completion_options(self.temperature, self.max_tokens);

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Vision transcription: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                strip_code_fences(&response.content).trim().to_string()
            }
            Err(e) => {
                warn!("Vision transcription failed: {}", e);
                String::new()
            }
        }
    }
}
