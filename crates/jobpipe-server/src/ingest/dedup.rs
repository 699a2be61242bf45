//! Duplicate detection
//!
//! Two independent checks run for every posting:
//!
//! 1. **Identity**: `(company_name, external_id)` already persisted, so the
//!    posting is skipped outright.
//! 2. **Content**: a freshly inserted record whose description hash matches an
//!    already-enriched record borrows that record's enrichment instead of calling
//!    the AI again.

use std::sync::Arc;
use uuid::Uuid;

use super::store::{JobStore, StoreResult};
use crate::models::{JobRecord, RawPosting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityDecision {
    /// A record with this identity exists
    Existing(Uuid),
    /// First sighting of this identity
    New,
}

#[derive(Clone)]
pub struct DedupEngine {
    store: Arc<dyn JobStore>,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn check_identity(&self, posting: &RawPosting) -> StoreResult<IdentityDecision> {
        Ok(
            match self
                .store
                .find_by_identity(&posting.company_name, &posting.external_id)
                .await?
            {
                Some(id) => IdentityDecision::Existing(id),
                None => IdentityDecision::New,
            },
        )
    }

    /// An enriched record sharing `record`'s description hash. Records without a
    /// hash (empty description) never match.
    pub async fn find_donor(&self, record: &JobRecord) -> StoreResult<Option<JobRecord>> {
        match record.description_hash.as_deref() {
            Some(hash) => self.store.find_enriched_by_hash(hash, record.id).await,
            None => Ok(None),
        }
    }
}
