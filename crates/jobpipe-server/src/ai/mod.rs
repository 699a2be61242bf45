//! AI capabilities consumed by the enrichment pipeline
//!
//! The pipeline only depends on the two traits below. Which implementation backs
//! them is a configuration choice ([`AiBackend`]): the OpenAI HTTP adapters in
//! [`openai`], or the deterministic [`mock`] adapters used offline and in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Enrichment, JobRecord};

pub mod mock;
pub mod openai;

pub use mock::{MockEmbedder, MockGenerator};
pub use openai::{OpenAiEmbedder, OpenAiGenerator};

/// Inputs to one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    pub skills: Vec<String>,
    pub title: String,
    pub company: String,
}

impl From<&JobRecord> for GenerationRequest {
    fn from(job: &JobRecord) -> Self {
        Self {
            description: job.description.clone(),
            skills: job.skills.clone(),
            title: job.title.clone(),
            company: job.company_name.clone(),
        }
    }
}

/// Text-generation capability
#[async_trait]
pub trait Generator: Send + Sync {
    /// Five resume bullets, five interview questions, extracted skills and an
    /// optional salary estimate for one posting.
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Enrichment>;
}

/// Embedding capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed-length vector for `text`
    async fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}

/// Which adapters back the AI capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiBackend {
    #[default]
    OpenAi,
    Mock,
}

impl std::str::FromStr for AiBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(AiBackend::OpenAi),
            "mock" => Ok(AiBackend::Mock),
            other => Err(anyhow::anyhow!("Invalid AI backend: {}", other)),
        }
    }
}
