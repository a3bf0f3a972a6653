//! Property Scout - multi-source property data reconciliation
//!
//! Several listing sources report noisy, partially failing views of the same
//! property. The `reconcile` core turns them into one consensus record and an
//! investment analysis; `sources` holds the acquisition side that feeds it.

pub mod config;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod sources;

pub use config::Config;
pub use error::{Result, ScoutError};
pub use models::{
    AnalysisResult, ConsensusRecord, DealParameters, Field, MarketSettings, NormalizedField,
    ObservationSet, PropertyReport, RawObservation, RawValue, SourceOutcome, SourceStatus,
};
pub use reconcile::{reconcile, Aggregator, Analyzer};
pub use sources::{Collector, ObservationSource, PropertyQuery, SnapshotCache};
