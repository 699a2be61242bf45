//! Job sources
//!
//! A source is anything that can produce a batch of [`RawPosting`]s. The set of
//! known sources is the closed [`SourceKind`] enumeration; names are validated
//! at lookup and an unknown name is a distinct [`SourceError::UnknownSource`].
//!
//! Three adapter families cover the registered sites:
//!
//! - [`workday::WorkdaySource`]: Workday candidate-experience JSON API (PwC)
//! - [`oracle_hcm::OracleHcmSource`]: Oracle Cloud HCM requisitions API (KPMG)
//! - [`career_page::CareerPageSource`]: server-rendered career pages (Deloitte, EY)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::RawPosting;

pub mod career_page;
pub mod experience;
pub mod html;
pub mod oracle_hcm;
pub mod workday;

pub use career_page::{CareerPageConfig, CareerPageSource};
pub use oracle_hcm::{OracleHcmConfig, OracleHcmSource};
pub use workday::{WorkdayConfig, WorkdaySource};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

/// Source capability
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Registry name, e.g. "pwc"
    fn name(&self) -> &str;

    /// Employer stamped on every posting, e.g. "PwC"
    fn company(&self) -> &str;

    /// One batch of postings. Any error fails the whole fetch.
    async fn fetch(&self) -> anyhow::Result<Vec<RawPosting>>;
}

/// The registered sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Deloitte,
    Pwc,
    Kpmg,
    Ey,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Deloitte,
        SourceKind::Pwc,
        SourceKind::Kpmg,
        SourceKind::Ey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Deloitte => "deloitte",
            SourceKind::Pwc => "pwc",
            SourceKind::Kpmg => "kpmg",
            SourceKind::Ey => "ey",
        }
    }

    pub fn company(&self) -> &'static str {
        match self {
            SourceKind::Deloitte => "Deloitte",
            SourceKind::Pwc => "PwC",
            SourceKind::Kpmg => "KPMG",
            SourceKind::Ey => "EY",
        }
    }

    /// Construct the adapter for this site
    pub fn build(&self, client: Client, max_jobs: usize) -> Arc<dyn JobSource> {
        match self {
            SourceKind::Pwc => Arc::new(WorkdaySource::new(client, WorkdayConfig::pwc(max_jobs))),
            SourceKind::Kpmg => {
                Arc::new(OracleHcmSource::new(client, OracleHcmConfig::kpmg(max_jobs)))
            },
            SourceKind::Deloitte => {
                Arc::new(CareerPageSource::new(client, CareerPageConfig::deloitte(max_jobs)))
            },
            SourceKind::Ey => Arc::new(CareerPageSource::new(client, CareerPageConfig::ey(max_jobs))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| SourceError::UnknownSource(s.to_string()))
    }
}

/// Which sources a run targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSelector {
    All,
    One(String),
}

impl SourceSelector {
    /// `None`, empty and "all" select every source
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => SourceSelector::All,
            Some(name) if name.eq_ignore_ascii_case("all") => SourceSelector::All,
            Some(name) => SourceSelector::One(name.to_lowercase()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SourceSelector::All => "all",
            SourceSelector::One(name) => name,
        }
    }
}

/// Named sources available to this process
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn JobSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every [`SourceKind`] with its production adapter
    pub fn standard(max_jobs: usize) -> anyhow::Result<Self> {
        let client = http_client()?;
        Ok(SourceKind::ALL
            .into_iter()
            .fold(Self::new(), |registry, kind| {
                registry.with_source(kind.build(client.clone(), max_jobs))
            }))
    }

    pub fn with_source(mut self, source: Arc<dyn JobSource>) -> Self {
        self.sources.insert(source.name().to_string(), source);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn JobSource>, SourceError> {
        self.sources
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }

    /// Sources picked by `selector`, validated against the registry
    pub fn resolve(&self, selector: &SourceSelector) -> Result<Vec<Arc<dyn JobSource>>, SourceError> {
        match selector {
            SourceSelector::All => Ok(self.sources.values().cloned().collect()),
            SourceSelector::One(name) => Ok(vec![self.get(name)?]),
        }
    }
}

/// Shared HTTP client for source adapters
pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build source HTTP client: {}", e))
}
