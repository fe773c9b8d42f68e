//! Metrics-query abstraction: versions, filter options, and evolution
//! fetches against the aggregates service.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::model::EvolutionMap;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("decode: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    /// Available "channel/version" identifiers.
    async fn list_versions(&self) -> Result<Vec<String>, SourceError>;

    /// Filter dimension name to its candidate values for one
    /// channel/version.
    async fn list_filter_options(
        &self,
        channel: &str,
        version: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, SourceError>;

    /// One keyed evolution map for a channel/version/metric/filter
    /// combination.
    async fn fetch_evolution(
        &self,
        channel: &str,
        version: &str,
        metric: &str,
        filters: &BTreeMap<String, String>,
        use_submission_date: bool,
    ) -> Result<EvolutionMap, SourceError>;
}
