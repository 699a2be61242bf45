//! Server-rendered career pages
//!
//! The listing page is scanned for job links; a per-site regex pulls the job id
//! out of each href. Each detail page is then fetched and its description read
//! with the first CSS selector that matches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::experience::is_entry_level;
use super::html::{collapse_whitespace, select_text};
use super::JobSource;
use crate::models::RawPosting;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerPageConfig {
    pub name: String,
    pub company: String,
    pub listing_url: String,
    /// Origin prepended to relative links
    pub base_url: String,
    /// CSS selector for job links on the listing page
    pub link_selector: String,
    /// Regex over the href; capture group 1 is the external id
    pub id_pattern: String,
    /// Description selectors, tried in order
    pub description_selectors: Vec<String>,
    pub default_location: Option<String>,
    pub max_jobs: usize,
}

impl CareerPageConfig {
    pub fn deloitte(max_jobs: usize) -> Self {
        Self {
            name: "deloitte".to_string(),
            company: "Deloitte".to_string(),
            listing_url: "https://apply.deloitte.com/en_US/careers/SearchJobs/?listFilterMode=1&jobRecordsPerPage=100&sort=relevancy".to_string(),
            base_url: "https://apply.deloitte.com".to_string(),
            link_selector: "article.article--result h3.article__header__text__title a.link".to_string(),
            id_pattern: r"/(\w{3,})(?:\?.*)?$".to_string(),
            description_selectors: vec![
                "div.article__view__item.view--rich-text span.field-value".to_string(),
                ".job-description".to_string(),
                ".article__content".to_string(),
                "article.article--details".to_string(),
            ],
            default_location: Some("India".to_string()),
            max_jobs,
        }
    }

    pub fn ey(max_jobs: usize) -> Self {
        Self {
            name: "ey".to_string(),
            company: "EY".to_string(),
            listing_url: "https://careers.ey.com/ey/search/?createNewAlert=false&q=&locationsearch=India&optionsFacetsDD_country=IN".to_string(),
            base_url: "https://careers.ey.com".to_string(),
            link_selector: "a[href*='/ey/job/']".to_string(),
            id_pattern: r"/ey/job/[^/]+/(\d+)".to_string(),
            description_selectors: vec![
                "span[itemprop='description']".to_string(),
                ".job-description".to_string(),
                ".job-details-content".to_string(),
                "#job-description".to_string(),
            ],
            default_location: Some("India".to_string()),
            max_jobs,
        }
    }
}

/// A job link found on the listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub external_id: String,
    pub title: String,
    pub url: String,
}

pub struct CareerPageSource {
    client: Client,
    config: CareerPageConfig,
}

impl CareerPageSource {
    pub fn new(client: Client, config: CareerPageConfig) -> Self {
        Self { client, config }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", url))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }

    /// Job links on a listing page, deduplicated by id, in page order
    pub fn parse_listing(&self, page: &str) -> Result<Vec<ListingLink>> {
        let selector = Selector::parse(&self.config.link_selector)
            .map_err(|e| anyhow::anyhow!("Invalid link selector: {}", e))?;
        let id_pattern = Regex::new(&self.config.id_pattern).context("Invalid id pattern")?;

        let doc = Html::parse_document(page);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in doc.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(external_id) = id_pattern
                .captures(href)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };
            if !seen.insert(external_id.clone()) {
                continue;
            }

            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", self.config.base_url.trim_end_matches('/'), href)
            };

            links.push(ListingLink {
                external_id,
                title: collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" ")),
                url,
            });
        }

        Ok(links)
    }
}

#[async_trait]
impl JobSource for CareerPageSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn company(&self) -> &str {
        &self.config.company
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>> {
        let listing = self.get_text(&self.config.listing_url).await?;
        let links = self.parse_listing(&listing)?;
        debug!(source = %self.config.name, links = links.len(), "Parsed listing page");

        let mut postings = Vec::new();
        for link in links.into_iter().filter(|l| is_entry_level(&l.title, "")) {
            if postings.len() >= self.config.max_jobs {
                break;
            }

            let description = match self.get_text(&link.url).await {
                Ok(page) => select_text(&page, &self.config.description_selectors).unwrap_or_default(),
                Err(e) => {
                    warn!(url = %link.url, error = %e, "Failed to fetch job page");
                    String::new()
                },
            };

            postings.push(RawPosting {
                external_id: link.external_id,
                title: link.title,
                description,
                company_name: self.config.company.clone(),
                apply_url: link.url,
                skills: Vec::new(),
                location: self.config.default_location.clone(),
                salary: None,
            });
        }

        info!(source = %self.config.name, count = postings.len(), "Fetched career page postings");
        Ok(postings)
    }
}
