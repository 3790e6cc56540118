//! Lyric translation.
//!
//! Translation is best effort: a line that fails to translate keeps its
//! original text and no translation. The rest of the timeline is unaffected.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::translation::{
    MARKER_PREFIX, MAX_CONCURRENT_REQUESTS, OPENAI_CHAT_URL, REQUEST_TIMEOUT_SECS,
};
use crate::error::{Error, Result};
use crate::lyrics::TimelineEntry;

/// Translates a single lyric line.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one line of text.
    async fn translate(&self, text: &str) -> Result<String>;

    /// Get the name of this translator (for debugging/logging).
    fn name(&self) -> &'static str;
}

/// Offline translator that only prefixes each line with a marker.
///
/// Useful for checking layout and timing without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerTranslator;

#[async_trait]
impl Translator for MarkerTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(format!("{MARKER_PREFIX}{text}"))
    }

    fn name(&self) -> &'static str {
        "MarkerTranslator"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Translator backed by the `OpenAI` chat completions API.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    target_language: String,
}

impl OpenAiTranslator {
    /// Create a translator from config; fails without an API key.
    pub fn new(config: &Config) -> Result<Self> {
        if !config.has_translation_credentials() {
            return Err(Error::config(
                "no OpenAI API key configured",
                "Set OPENAI_API_KEY in the environment or .env file",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.translate_model.clone(),
            target_language: config.target_language.clone(),
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a professional translator of song lyrics. Translate the line you are given into {}. \
             Keep it natural and singable. Reply with the translated line only.",
            self.target_language
        )
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system".to_string(), content: self.system_prompt() },
                ChatMessage { role: "user".to_string(), content: text.to_string() },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::translation_status(
                format!("OpenAI returned {status}: {}", body.trim()),
                status.as_u16(),
            ));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| Error::Translation { message: e.to_string(), status: None })?;

        let translated = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Translation { message: "empty completion".to_string(), status: None })?;

        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "OpenAiTranslator"
    }
}

/// Fill in `translated_text` for every entry with a bounded number of
/// requests in flight. Returns how many entries were translated.
pub async fn translate_timeline(entries: &mut [TimelineEntry], translator: &dyn Translator) -> usize {
    let results: Vec<Result<String>> = stream::iter(entries.iter().map(|e| e.text.clone()))
        .map(|text| async move { translator.translate(&text).await })
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

    let mut translated = 0;
    for (entry, result) in entries.iter_mut().zip(results) {
        match result {
            Ok(text) => {
                entry.translated_text = Some(text);
                translated += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "{} failed at {:.0} ms ({:?}): {e}",
                    translator.name(),
                    entry.mix_time_ms,
                    entry.text
                );
                entry.translated_text = None;
            }
        }
    }

    tracing::info!("Translated {translated}/{} lines with {}", entries.len(), translator.name());
    translated
}
