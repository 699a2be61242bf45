//! Oracle Cloud HCM recruiting API
//!
//! Search results arrive as `items[].requisitionList[]`; descriptions come from
//! the per-requisition resource. Detail payloads vary between tenants so several
//! description fields are tried.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::experience::is_entry_level;
use super::html::html_to_text;
use super::JobSource;
use crate::models::RawPosting;

const DESCRIPTION_FIELDS: &[&str] = &[
    "ExternalDescriptionStr",
    "externalDescription",
    "description",
    "longDescription",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleHcmConfig {
    pub name: String,
    pub company: String,
    /// Requisition search URL including the `finder` parameter; `,offset=N` is appended
    pub search_url: String,
    /// Base of the per-requisition resource, `/{id}` is appended
    pub detail_url: String,
    /// Candidate portal prefix for apply links, `/{id}` is appended
    pub portal_url: String,
    pub page_size: usize,
    pub max_pages: usize,
    pub max_jobs: usize,
}

impl OracleHcmConfig {
    pub fn kpmg(max_jobs: usize) -> Self {
        let host = "https://ejvp.fa.us2.oraclecloud.com";
        Self {
            name: "kpmg".to_string(),
            company: "KPMG".to_string(),
            search_url: format!(
                "{host}/hcmRestApi/resources/latest/recruitingCEJobRequisitions?onlyData=true\
                 &expand=requisitionList.secondaryLocations\
                 &finder=findReqs;siteNumber=CX_1,limit=25,sortBy=POSTING_DATES_DESC"
            ),
            detail_url: format!("{host}/hcmRestApi/resources/latest/recruitingCEJobRequisitions"),
            portal_url: format!("{host}/hcmUI/CandidateExperience/en/sites/CX_1/job"),
            page_size: 25,
            max_pages: 4,
            max_jobs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(default)]
    requisition_list: Vec<Requisition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Requisition {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: String,
    primary_location: Option<String>,
}

pub struct OracleHcmSource {
    client: Client,
    config: OracleHcmConfig,
}

impl OracleHcmSource {
    pub fn new(client: Client, config: OracleHcmConfig) -> Self {
        Self { client, config }
    }

    async fn search_page(&self, offset: usize) -> Result<SearchResponse> {
        self.client
            .get(format!("{},offset={}", self.config.search_url, offset))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Oracle HCM search request failed")?
            .error_for_status()
            .context("Oracle HCM search returned an error status")?
            .json()
            .await
            .context("Failed to decode Oracle HCM search response")
    }

    async fn description(&self, id: &str) -> Result<String> {
        let detail: Value = self
            .client
            .get(format!("{}/{}", self.config.detail_url, id))
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(DESCRIPTION_FIELDS
            .iter()
            .find_map(|field| detail.get(*field).and_then(Value::as_str))
            .map(html_to_text)
            .unwrap_or_default())
    }
}

/// Requisition ids come back as numbers on some tenants and strings on others
fn requisition_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl JobSource for OracleHcmSource {
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
            let response = self.search_page(page * self.config.page_size).await?;

            for requisition in response.items.iter().flat_map(|item| &item.requisition_list) {
                if postings.len() >= self.config.max_jobs {
                    break 'pages;
                }

                let Some(id) = requisition_id(&requisition.id) else {
                    continue;
                };
                if requisition.title.is_empty() || !is_entry_level(&requisition.title, "") {
                    debug!(title = %requisition.title, "Skipping requisition");
                    continue;
                }

                let description = match self.description(&id).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Failed to fetch requisition detail");
                        String::new()
                    },
                };

                postings.push(RawPosting {
                    apply_url: format!("{}/{}", self.config.portal_url, id),
                    external_id: id,
                    title: requisition.title.clone(),
                    description,
                    company_name: self.config.company.clone(),
                    skills: Vec::new(),
                    location: requisition.primary_location.clone(),
                    salary: None,
                });
            }

            if !response.has_more {
                break;
            }
        }

        info!(source = %self.config.name, count = postings.len(), "Fetched Oracle HCM postings");
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requisition_ids() {
        assert_eq!(requisition_id(&serde_json::json!(25011)), Some("25011".to_string()));
        assert_eq!(requisition_id(&serde_json::json!("R-77")), Some("R-77".to_string()));
        assert_eq!(requisition_id(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_search_response_shape() {
        let body = r#"{"items": [{"requisitionList": [
            {"Id": 101, "Title": "Associate Consultant", "PrimaryLocation": "Gurgaon"}]}],
            "hasMore": false}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.has_more);
        assert_eq!(parsed.items[0].requisition_list[0].title, "Associate Consultant");
    }
}
