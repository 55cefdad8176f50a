use std::env;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use speedread_core::WordSets;

use crate::error::ClassifierError;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that processes educational content for Hong Kong students.";

const TASK_PROMPT: &str = "\
You are an expert Chinese language teacher specialized in Hong Kong Traditional Chinese education.
Analyze the input provided. It will be either a raw text string or an image containing Chinese text.

Task:
1. Identify all distinct Chinese words/phrases.
2. Output must be in Traditional Chinese (繁體中文). Convert any Simplified Chinese to Traditional.
3. Sort them into three difficulty levels based on Hong Kong primary school standards:
   - Level A: Easy, basic, common daily words (1-2 characters, e.g. 蘋果, 學校).
   - Level B: Medium, intermediate (2-3 characters, e.g. 圖書館, 蝴蝶).
   - Level C: Hard, advanced, idioms or formal vocabulary (4 characters, e.g. 興高采烈).
4. Ensure each level has at least 5 words. If the input is too short, generate related words in Traditional Chinese.
5. Return ONLY a JSON object of the form {\"A\": [...], \"B\": [...], \"C\": [...]}.";

/// An image attached to a classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Free-form text and/or an image to turn into word sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierInput {
    pub text: String,
    pub image: Option<ImageInput>,
}

impl ClassifierInput {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

/// Produces word sets for the three levels from player-supplied material.
#[async_trait]
pub trait WordSetClassifier: Send + Sync {
    /// Classify the input into three non-empty word lists.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError` if the input is empty, the upstream call
    /// fails, or the result is missing a level.
    async fn classify(&self, input: &ClassifierInput) -> Result<WordSets, ClassifierError>;
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ClassifierConfig {
    /// Read `SPEEDREAD_AI_API_KEY`, `SPEEDREAD_AI_BASE_URL` and
    /// `SPEEDREAD_AI_MODEL`. Returns `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("SPEEDREAD_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("SPEEDREAD_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("SPEEDREAD_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }

    /// Check that the base URL parses.
    ///
    /// # Errors
    ///
    /// Returns the offending URL if it is not a valid absolute URL.
    pub fn validate(self) -> Result<Self, String> {
        match Url::parse(&self.base_url) {
            Ok(_) => Ok(self),
            Err(_) => Err(self.base_url),
        }
    }
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct HttpWordSetClassifier {
    client: Client,
    config: Option<ClassifierConfig>,
}

impl HttpWordSetClassifier {
    #[must_use]
    pub fn new(config: Option<ClassifierConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn build_request(config: &ClassifierConfig, input: &ClassifierInput) -> ChatRequest {
        let mut parts = vec![ContentPart::Text {
            text: TASK_PROMPT.to_owned(),
        }];
        let text = input.text.trim();
        if !text.is_empty() {
            parts.push(ContentPart::Text {
                text: format!("Analyze this text: {text}"),
            });
        }
        if let Some(image) = &input.image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            });
        }

        ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: SYSTEM_PROMPT.to_owned(),
                    }],
                },
                ChatMessage {
                    role: "user",
                    content: parts,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        }
    }
}

#[async_trait]
impl WordSetClassifier for HttpWordSetClassifier {
    async fn classify(&self, input: &ClassifierInput) -> Result<WordSets, ClassifierError> {
        let config = self.config.as_ref().ok_or(ClassifierError::Disabled)?;
        if input.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = Self::build_request(config, input);
        debug!(model = %config.model, has_image = input.image.is_some(), "classifying word sets");

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "classifier request rejected");
            return Err(ClassifierError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)?;

        parse_word_sets(&content)
    }
}

/// Decode a model reply into validated word sets.
///
/// Tolerates a surrounding Markdown code fence.
///
/// # Errors
///
/// Returns `InvalidResponse` for malformed JSON and `IncompleteWordSets` when
/// a level has no words.
pub fn parse_word_sets(content: &str) -> Result<WordSets, ClassifierError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let sets: WordSets = serde_json::from_str(json.trim())
        .map_err(|err| ClassifierError::InvalidResponse(err.to_string()))?;
    Ok(sets.validate()?)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
