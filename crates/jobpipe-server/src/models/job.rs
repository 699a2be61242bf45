//! Job postings and records

use chrono::{DateTime, Utc};
use jobpipe_common::content_hash::description_hash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of resume bullets and interview questions every enrichment carries
pub const ENRICHMENT_ITEMS: usize = 5;

/// Upper bound on skills kept from the generator
pub const MAX_EXTRACTED_SKILLS: usize = 15;

/// A posting as returned by a source, before any dedup decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub apply_url: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
}

/// Lifecycle of a persisted record
///
/// Records are inserted as `Processing` and move to `Active` once enrichment
/// (or hash-based cloning) lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Active,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Active => "active",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(JobStatus::Processing),
            "active" => Ok(JobStatus::Active),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// One interview question with the suggested way to answer it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepQuestion {
    pub question: String,
    pub answer_strategy: String,
}

/// Output of the generation capability for one posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub resume_guide: Vec<String>,
    pub prep_questions: Vec<PrepQuestion>,
    #[serde(default)]
    pub extracted_skills: Vec<String>,
    pub estimated_salary_range: Option<String>,
}

impl Enrichment {
    /// Checks the fixed shape: five guide bullets, five questions, bounded skills.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resume_guide.len() != ENRICHMENT_ITEMS {
            anyhow::bail!(
                "resume_guide must have {} items, got {}",
                ENRICHMENT_ITEMS,
                self.resume_guide.len()
            );
        }
        if self.prep_questions.len() != ENRICHMENT_ITEMS {
            anyhow::bail!(
                "prep_questions must have {} items, got {}",
                ENRICHMENT_ITEMS,
                self.prep_questions.len()
            );
        }
        if self.extracted_skills.len() > MAX_EXTRACTED_SKILLS {
            anyhow::bail!(
                "extracted_skills must have at most {} items, got {}",
                MAX_EXTRACTED_SKILLS,
                self.extracted_skills.len()
            );
        }
        Ok(())
    }
}

/// Insert payload for a first-seen identity
#[derive(Debug, Clone)]
pub struct NewJob {
    pub company_name: String,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub apply_url: String,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub skills: Vec<String>,
    pub description_hash: Option<String>,
}

impl From<&RawPosting> for NewJob {
    fn from(posting: &RawPosting) -> Self {
        Self {
            company_name: posting.company_name.clone(),
            external_id: posting.external_id.clone(),
            title: posting.title.clone(),
            description: posting.description.clone(),
            apply_url: posting.apply_url.clone(),
            location: posting.location.clone(),
            salary_range: posting.salary.clone(),
            skills: posting.skills.clone(),
            description_hash: description_hash(&posting.description),
        }
    }
}

/// A persisted job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub company_name: String,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub apply_url: String,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub skills: Vec<String>,
    pub description_hash: Option<String>,
    pub resume_guide: Option<Vec<String>>,
    pub prep_questions: Option<Vec<PrepQuestion>>,
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A record counts as enriched once it carries an embedding.
    pub fn is_enriched(&self) -> bool {
        self.embedding.is_some()
    }

    /// True when any of guide, questions or embedding is absent.
    pub fn missing_enrichment(&self) -> bool {
        self.resume_guide.is_none() || self.prep_questions.is_none() || self.embedding.is_none()
    }
}
