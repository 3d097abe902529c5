//! AI-assisted translation through an OpenAI-compatible chat API.
//!
//! Sends each note as a single chat completion with a fixed system prompt
//! tuned for ComfyUI vocabulary, then checks the answer before accepting it.

use super::{
    LanguageDetector, TranslationBackend, TranslationOutcome, UnchangedReason,
    check_response_status, create_http_client, language_name,
};
use crate::config::{ApiConfig, AUTO_LANGUAGE, BackendKind, TranslationConfig, same_language};
use crate::console::Console;
use crate::error::TranslationError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Source language assumed when detection gives no answer.
const FALLBACK_SOURCE: &str = "en";

/// Regex to unwrap a completion the model put inside a code fence.
static CODE_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("Invalid CODE_FENCE_REGEX")
});

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

/// A message in the conversation.
#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// A single choice in the response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// Message content in a response.
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Translator using an LLM chat completion endpoint.
pub struct AiTranslator {
    /// HTTP client for API requests.
    client: Client,
    /// API configuration.
    api_config: ApiConfig,
    /// Translation behavior configuration.
    settings: TranslationConfig,
    /// Used when the source language is `auto`.
    detector: Box<dyn LanguageDetector>,
    /// Console for output.
    console: Console,
}

impl AiTranslator {
    /// Create a new AiTranslator.
    pub fn new(
        api_config: ApiConfig,
        settings: TranslationConfig,
        detector: Box<dyn LanguageDetector>,
        console: Console,
    ) -> Result<Self, TranslationError> {
        Ok(Self {
            client: create_http_client()?,
            api_config,
            settings,
            detector,
            console,
        })
    }

    /// Turns `auto` into a concrete code, falling back to English.
    async fn resolve_source(&self, text: &str, source: &str) -> String {
        if !source.trim().eq_ignore_ascii_case(AUTO_LANGUAGE) {
            return source.trim().to_lowercase();
        }

        match self.detector.detect(text).await {
            Ok(Some(code)) => {
                self.console
                    .info(&format!("Detected source language: {}", language_name(&code)));
                code
            }
            Ok(None) => {
                self.console.warning(&format!(
                    "Could not detect the source language, assuming '{}'",
                    FALLBACK_SOURCE
                ));
                FALLBACK_SOURCE.to_string()
            }
            Err(e) => {
                self.console.warning(&format!(
                    "Language detection failed ({}), assuming '{}'",
                    e, FALLBACK_SOURCE
                ));
                FALLBACK_SOURCE.to_string()
            }
        }
    }

    /// Sends one chat completion and returns the raw completion text.
    async fn complete(&self, text: &str, prompt: String) -> Result<String, TranslationError> {
        let request = ChatRequest {
            model: self.api_config.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt,
                },
                Message {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: max_tokens_for(text),
        };

        let url = format!(
            "{}/chat/completions",
            self.api_config.base_url.trim_end_matches('/')
        );
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_config.key.trim()))
            .header("Content-Type", "application/json");

        if !self.api_config.http_referer.trim().is_empty() {
            builder = builder.header("HTTP-Referer", self.api_config.http_referer.trim());
        }
        if !self.api_config.x_title.trim().is_empty() {
            builder = builder.header("X-Title", self.api_config.x_title.trim());
        }

        let response = builder.json(&request).send().await?;
        let response = check_response_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::ParseError("response has no content".to_string()))
    }

    /// Full AI translation path once the blank and same-language checks passed.
    async fn translate_checked(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let prompt = system_prompt(&language_name(source), &language_name(target));
        let completion = self.complete(text, prompt).await?;
        check_completion(text, &completion, &self.settings)
    }
}

#[async_trait]
impl TranslationBackend for AiTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::Ai
    }

    fn name(&self) -> &'static str {
        "AI (chat completion)"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome {
        if text.trim().is_empty() {
            return TranslationOutcome::Unchanged(UnchangedReason::BlankInput);
        }

        if !self.api_config.is_configured() {
            return TranslationOutcome::Unchanged(UnchangedReason::Failed(
                TranslationError::NotConfigured("api.key".to_string()),
            ));
        }

        let source = self.resolve_source(text, source).await;
        if same_language(&source, target) {
            return TranslationOutcome::Unchanged(UnchangedReason::SameLanguage);
        }

        TranslationOutcome::from_result(self.translate_checked(text, &source, target).await)
    }
}

/// Output token budget for a note: three tokens per word plus headroom.
pub fn max_tokens_for(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.saturating_mul(3).saturating_add(100)
}

/// Validates a completion and returns the text to use.
///
/// Strips surrounding whitespace and a wrapping code fence (unless the
/// original was itself fenced), then rejects empty answers and answers that
/// are too short to be a full translation.
pub fn check_completion(
    original: &str,
    completion: &str,
    settings: &TranslationConfig,
) -> Result<String, TranslationError> {
    let mut translated = completion.trim().to_string();

    if !original.trim_start().starts_with("```") {
        if let Some(inner) = CODE_FENCE_REGEX
            .captures(&translated)
            .and_then(|caps| caps.get(1))
        {
            translated = inner.as_str().to_string();
        }
    }

    if translated.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }

    // Character counts, so accented and CJK text is not over-counted.
    let original_len = original.chars().count();
    let translated_len = translated.chars().count();
    if original_len > settings.min_checked_length
        && (translated_len as f64) < original_len as f64 * settings.min_length_ratio
    {
        return Err(TranslationError::SuspiciousOutput {
            original: original_len,
            translated: translated_len,
        });
    }

    Ok(translated)
}

/// System instruction for translating ComfyUI notes.
pub fn system_prompt(source_name: &str, target_name: &str) -> String {
    format!(
        r#"You are an expert translation assistant.
Your task is to translate user notes from {source} to {target}.
These notes come from ComfyUI, an image generation tool based on diffusion models.
Translate technical terms about artificial intelligence, machine learning, diffusion models, samplers, schedulers, checkpoints, LoRAs, VAEs, ControlNets and the ComfyUI interface as precisely as possible.
When a technical term has an established, commonly accepted translation in {target} within the AI field, use it.
Keep in {source} any proper name of a technique, model or ComfyUI parameter (for example "Euler a", "DPM++ 2M Karras", "CFG Scale"), and any term whose literal translation would cause confusion or lose technical meaning.
Preserve the original formatting, including line breaks, lists, node names in brackets and simple Markdown such as *italic* or **bold**.
Do not add comments, introductions or conclusions; return only the translated text.

Example note 1:
Original: "Tip: multistep samplers usually adhere to unsampled images more effectively than others."
Spanish translation: "Consejo: los samplers de múltiples pasos suelen adherirse a las imágenes no muestreadas (unsampled) de manera más efectiva que otros."

Example note 2:
Original: "This is a checkpoint that, for convenience, includes the stage B lite CSBW finetune, clip G, and stage A (the FT_HQ finetune)."
Spanish translation: "Este es un checkpoint que, por conveniencia, incluye el finetune CSBW lite de la etapa B, clip G, y la etapa A (el finetune FT_HQ)."

Translate the following text from {source} to {target} following these guidelines:"#,
        source = source_name,
        target = target_name,
    )
}
