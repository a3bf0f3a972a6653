mod analysis;
mod consensus;
mod observation;

pub use analysis::{
    AnalysisResult, DealParameters, MarketSettings, PropertyReport, MAX_HOLD_MONTHS,
};
pub use consensus::{
    ConsensusRecord, NormalizedField, SourceOutcome, SourceStatus, MAX_PLAUSIBLE_YEAR, MIN_CONFIDENT_SOURCES,
    MIN_PLAUSIBLE_YEAR,
};
pub use observation::{Field, ObservationSet, RawObservation, RawValue};
