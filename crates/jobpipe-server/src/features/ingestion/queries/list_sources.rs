//! List sources query

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::sources::SourceRegistry;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSourcesQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSourcesResponse {
    pub sources: Vec<String>,
}

impl Request<ListSourcesResponse> for ListSourcesQuery {}

pub fn handle(registry: &SourceRegistry, _query: ListSourcesQuery) -> ListSourcesResponse {
    ListSourcesResponse {
        sources: registry.names(),
    }
}
