//! Workday candidate-experience API
//!
//! Listing is a paged `POST {api_base}/jobs`; each posting's description comes
//! from `GET {api_base}/job/{slug}` as HTML.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::experience::is_entry_level;
use super::html::html_to_text;
use super::JobSource;
use crate::models::RawPosting;

const CITY_SUFFIXES: &[&str] = &[
    "KOLKATA", "MUMBAI", "NEW_DELHI", "DELHI", "BANGALORE", "BENGALURU", "HYDERABAD", "CHENNAI",
    "PUNE", "GURGAON", "GURUGRAM", "NOIDA", "AHMEDABAD", "KOCHI", "JAIPUR",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkdayConfig {
    pub name: String,
    pub company: String,
    /// e.g. https://pwc.wd3.myworkdayjobs.com/wday/cxs/pwc/Global_Experienced_Careers
    pub api_base: String,
    /// Public site prefix for apply links
    pub site_url: String,
    pub search_text: String,
    pub page_size: usize,
    pub max_pages: usize,
    pub max_jobs: usize,
}

impl WorkdayConfig {
    pub fn pwc(max_jobs: usize) -> Self {
        Self {
            name: "pwc".to_string(),
            company: "PwC".to_string(),
            api_base: "https://pwc.wd3.myworkdayjobs.com/wday/cxs/pwc/Global_Experienced_Careers"
                .to_string(),
            site_url: "https://pwc.wd3.myworkdayjobs.com/en-US/Global_Experienced_Careers".to_string(),
            search_text: String::new(),
            page_size: 20,
            max_pages: 5,
            max_jobs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    job_postings: Vec<SearchPosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPosting {
    #[serde(default)]
    title: String,
    #[serde(default)]
    external_path: String,
    locations_text: Option<String>,
    #[serde(default)]
    bullet_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    job_posting_info: Option<DetailInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailInfo {
    job_description: Option<String>,
}

pub struct WorkdaySource {
    client: Client,
    config: WorkdayConfig,
}

impl WorkdaySource {
    pub fn new(client: Client, config: WorkdayConfig) -> Self {
        Self { client, config }
    }

    async fn search_page(&self, offset: usize) -> Result<SearchResponse> {
        let body = json!({
            "appliedFacets": {},
            "limit": self.config.page_size,
            "offset": offset,
            "searchText": self.config.search_text,
        });

        self.client
            .post(format!("{}/jobs", self.config.api_base))
            .json(&body)
            .send()
            .await
            .context("Workday search request failed")?
            .error_for_status()
            .context("Workday search returned an error status")?
            .json()
            .await
            .context("Failed to decode Workday search response")
    }

    async fn description(&self, slug: &str) -> Result<String> {
        let detail: DetailResponse = self
            .client
            .get(format!("{}/job/{}", self.config.api_base, slug))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(detail
            .job_posting_info
            .and_then(|info| info.job_description)
            .map(|html| html_to_text(&html))
            .unwrap_or_default())
    }
}

#[async_trait]
impl JobSource for WorkdaySource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn company(&self) -> &str {
        &self.config.company
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>> {
        let mut postings = Vec::new();

        'pages: for page in 0..self.config.max_pages {
            if postings.len() >= self.config.max_jobs {
                break;
            }
            let offset = page * self.config.page_size;
            let response = self.search_page(offset).await?;
            if response.job_postings.is_empty() {
                break;
            }

            for job in &response.job_postings {
                if postings.len() >= self.config.max_jobs {
                    break 'pages;
                }

                let Some(slug) = job.external_path.rsplit('/').next().filter(|s| !s.is_empty())
                else {
                    continue;
                };
                if !is_entry_level(&job.title, &job.bullet_fields.join(" ")) {
                    debug!(title = %job.title, "Skipping non entry-level posting");
                    continue;
                }

                let description = match self.description(slug).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(slug, error = %e, "Failed to fetch Workday job detail");
                        String::new()
                    },
                };

                postings.push(RawPosting {
                    external_id: slug.to_string(),
                    title: clean_title(&job.title),
                    description,
                    company_name: self.config.company.clone(),
                    apply_url: format!("{}{}", self.config.site_url, job.external_path),
                    skills: Vec::new(),
                    location: job.locations_text.clone(),
                    salary: None,
                });
            }

            if response.total.is_some_and(|total| offset + self.config.page_size >= total) {
                break;
            }
        }

        info!(source = %self.config.name, count = postings.len(), "Fetched Workday postings");
        Ok(postings)
    }
}

/// Turn requisition-code titles like `IN_ASSOCIATE_DATA_&_ANALYTICS_KOLKATA`
/// into `Associate Data & Analytics`. Ordinary titles pass through.
pub fn clean_title(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains(' ') || !raw.contains('_') {
        return raw.to_string();
    }

    let mut code = raw;
    if code.len() > 3 && code.as_bytes()[2] == b'_' && code[..2].chars().all(|c| c.is_ascii_uppercase())
    {
        code = &code[3..];
    }
    for city in CITY_SUFFIXES {
        if let Some(stripped) = code.strip_suffix(&format!("_{}", city)) {
            code = stripped;
            break;
        }
    }

    code.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title() {
        assert_eq!(
            clean_title("IN_ASSOCIATE_JAVA_DEVELOPER_DATA_&_ANALYTICS_ADVISORY_KOLKATA"),
            "Associate Java Developer Data & Analytics Advisory"
        );
        assert_eq!(clean_title("Associate - Tax"), "Associate - Tax");
    }

    #[test]
    fn test_search_response_shape() {
        let body = r#"{"total": 1, "jobPostings": [{"title": "Associate",
            "externalPath": "/job/Kolkata/Associate_123WD", "locationsText": "Kolkata",
            "bulletFields": ["123WD"]}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total, Some(1));
        assert_eq!(parsed.job_postings[0].external_path.rsplit('/').next(), Some("Associate_123WD"));
    }
}
