//! OpenAI HTTP adapters
//!
//! Thin reqwest clients for the chat-completions and embeddings endpoints. The
//! chat call asks for a JSON object and the reply is parsed and shape-checked
//! into [`Enrichment`]; anything off-shape is an error so the record stays
//! unenriched and is retried by reconciliation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Embedder, GenerationRequest, Generator};
use crate::models::{Enrichment, MAX_EXTRACTED_SKILLS};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Embedding input is cut to this many characters
pub const MAX_EMBEDDING_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str = "You are an expert career coach. Given a job posting, reply with a JSON object \
with the keys resume_guide (exactly 5 resume optimization bullet points), prep_questions (exactly 5 objects \
with question and answer_strategy), extracted_skills (the top 5-10 technical skills of the role) and \
estimated_salary_range (a short string, or null). Be specific to the role and company.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("Failed to build OpenAI HTTP client")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    fn user_prompt(request: &GenerationRequest) -> String {
        let skills = if request.skills.is_empty() {
            "Not specified".to_string()
        } else {
            request.skills.join(", ")
        };
        let role = match (request.title.is_empty(), request.company.is_empty()) {
            (false, false) => format!("{} at {}", request.title, request.company),
            (false, true) => request.title.clone(),
            _ => "this role".to_string(),
        };

        format!(
            "## Role: {}\n\n## Job Description\n{}\n\n## Required Skills\n{}",
            role, request.description, skills
        )
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Enrichment> {
        let body = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(request),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.4,
        };

        let response: ChatResponse = self
            .client
            .post(self.config.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call chat completions")?
            .error_for_status()
            .context("Chat completions returned an error status")?
            .json()
            .await
            .context("Failed to decode chat completions response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Chat completions response had no content")?;

        let mut enrichment: Enrichment =
            serde_json::from_str(&content).context("Generated content is not valid enrichment JSON")?;
        enrichment.extracted_skills.truncate(MAX_EXTRACTED_SKILLS);
        enrichment.validate()?;

        debug!(title = %request.title, "Generated enrichment");
        Ok(enrichment)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

/// First `max` characters of `text`, on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: truncate_chars(text, MAX_EMBEDDING_CHARS),
            dimensions: self.config.dimensions,
        };

        let response: EmbeddingResponse = self
            .client
            .post(self.config.url("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call embeddings")?
            .error_for_status()
            .context("Embeddings returned an error status")?
            .json()
            .await
            .context("Failed to decode embeddings response")?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("Embeddings response had no data")?;

        if vector.len() != self.config.dimensions {
            anyhow::bail!(
                "Expected {} embedding dimensions, got {}",
                self.config.dimensions,
                vector.len()
            );
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_user_prompt_falls_back_when_skills_missing() {
        let prompt = OpenAiGenerator::user_prompt(&GenerationRequest {
            description: "Audit support".into(),
            skills: vec![],
            title: "Associate".into(),
            company: "Deloitte".into(),
        });
        assert!(prompt.contains("Associate at Deloitte"));
        assert!(prompt.contains("Not specified"));
    }
}
