//! Deterministic offline adapters
//!
//! Both adapters derive their output from the input text, so identical
//! descriptions produce identical enrichment. They count calls, which the
//! pipeline tests use to assert how often the AI was reached.

use async_trait::async_trait;
use jobpipe_common::content_hash::sha256_hex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Embedder, GenerationRequest, Generator};
use crate::models::{Enrichment, PrepQuestion, ENRICHMENT_ITEMS};

#[derive(Debug, Default)]
pub struct MockGenerator {
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Enrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let digest = sha256_hex(request.description.as_bytes());
        let tag = &digest[..8];

        Ok(Enrichment {
            resume_guide: (1..=ENRICHMENT_ITEMS)
                .map(|i| format!("Highlight {} experience relevant to {} ({})", i, request.title, tag))
                .collect(),
            prep_questions: (1..=ENRICHMENT_ITEMS)
                .map(|i| PrepQuestion {
                    question: format!("Question {} about {} at {}", i, request.title, request.company),
                    answer_strategy: format!("Use a STAR example ({}-{})", tag, i),
                })
                .collect(),
            extracted_skills: vec!["communication".to_string(), "excel".to_string()],
            estimated_salary_range: Some("4-6 LPA".to_string()),
        })
    }
}

#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let digest = sha256_hex(text.as_bytes());
        let bytes = digest.as_bytes();
        Ok((0..self.dimensions)
            .map(|i| f32::from(bytes[i % bytes.len()]) / 255.0)
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
