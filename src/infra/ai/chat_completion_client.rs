// Chat-completion classifier - scores text by asking an LLM endpoint.
//
// Works with any OpenAI-compatible `/chat/completions` endpoint. The default
// points at Fireworks. The model is asked to answer with a JSON object of
// rule name -> probability, which arrives as the *content string* of the
// first choice and is decoded separately from the envelope.

use crate::core::moderation::classifier::{decode_classification, system_instruction};
use crate::core::moderation::{
    ClassificationResult, Classifier, ClassifierError, ConfigError, RuleSet,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.fireworks.ai/inference/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "accounts/fireworks/models/deepseek-v3p2";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Upper bound on establishing a connection. There is no read deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ClassifierOptions {
    /// Default endpoint and model, deterministic decoding.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }
}

pub struct ChatCompletionClassifier {
    client: Client,
    options: ClassifierOptions,
}

impl ChatCompletionClassifier {
    pub fn new(options: ClassifierOptions) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client, options })
    }
}

#[async_trait]
impl Classifier for ChatCompletionClassifier {
    async fn classify(
        &self,
        sample: &str,
        rules: &RuleSet,
    ) -> Result<ClassificationResult, ClassifierError> {
        let system = system_instruction(rules);
        let payload = CompletionRequest {
            model: &self.options.model,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: sample,
                },
            ],
        };

        tracing::debug!(
            endpoint = %self.options.endpoint,
            rules = rules.len(),
            sample_chars = sample.chars().count(),
            "Sending classification request"
        );

        let response = self
            .client
            .post(&self.options.endpoint)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.options.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| ClassifierError::Envelope(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ClassifierError::Envelope("no message content in first choice".to_string()))?;

        decode_classification(&content)
    }
}

// --- Chat completion request/response types ---

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
