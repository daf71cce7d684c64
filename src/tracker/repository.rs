use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    error::Result,
    tracker::types::{ClosurePayload, ImportStats, ReconciledFragment, TrackedEntity, TrackedEntityQuery},
};

/// Remote source of tracker data and sink for closure payloads
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrackerRepository: Send + Sync {
    /// Bulk read of every tracked entity matching the query. Pagination is hidden here.
    async fn fetch(&self, query: &TrackedEntityQuery) -> Result<Vec<TrackedEntity>>;

    /// Authoritative enrollment/org-unit slice for a single tracked entity
    async fn lookup_one(&self, tracked_entity_id: &str) -> Result<ReconciledFragment>;

    /// Import the payload atomically
    async fn submit(&self, payload: &ClosurePayload) -> Result<ImportStats>;
}
