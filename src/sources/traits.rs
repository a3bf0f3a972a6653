use crate::models::RawObservation;
use anyhow::Result;
use async_trait::async_trait;

use super::types::PropertyQuery;

/// Common trait for everything that can report on a property.
///
/// Implementations only extract; reconciling what they report is the core's
/// job. An `Err` is turned into a failure observation by the collector.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Fetch this source's view of the queried property
    async fn fetch(&self, query: &PropertyQuery) -> Result<RawObservation>;

    /// Identifier the observation is attributed to
    fn source_id(&self) -> &str;
}
