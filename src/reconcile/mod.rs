//! Multi-source reconciliation core.
//!
//! Normalizer -> Aggregator -> Analyzer, all pure and synchronous. Nothing in
//! here performs I/O or keeps state between requests.

pub mod aggregator;
pub mod analyzer;
pub mod irr;
pub mod normalizer;

pub use aggregator::{Aggregator, FAILURE_SENTINELS, IMAGE_CAP};
pub use analyzer::Analyzer;
pub use normalizer::{
    normalize_numeric, normalize_verbatim, normalize_year, NormalizedObservation, PARSE_SENTINELS,
};

use chrono::Utc;

use crate::error::Result;
use crate::models::{DealParameters, MarketSettings, ObservationSet, PropertyReport};

/// Run the full pipeline for one property.
///
/// Fails only on structurally invalid observations or out-of-range deal terms.
pub fn reconcile(
    address: &str,
    observations: &ObservationSet,
    deal: &DealParameters,
    settings: &MarketSettings,
) -> Result<PropertyReport> {
    deal.validate()?;
    let consensus = Aggregator::new().aggregate(observations)?;
    let analysis = Analyzer::new(settings.clone()).analyze(&consensus, deal);

    Ok(PropertyReport {
        address: address.to_string(),
        consensus,
        deal: deal.clone(),
        analysis,
        generated_at: Utc::now(),
    })
}
