use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::observation::{Field, RawValue};

/// Earliest year built accepted as plausible
pub const MIN_PLAUSIBLE_YEAR: i64 = 1800;
/// Latest year built accepted as plausible
pub const MAX_PLAUSIBLE_YEAR: i64 = 2025;

/// Below this many successful sources the consensus is flagged low-confidence
pub const MIN_CONFIDENT_SOURCES: usize = 2;

/// Result of parsing one raw field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum NormalizedField<T> {
    Present(T),
    Unavailable,
}

impl<T> NormalizedField<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, NormalizedField::Present(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            NormalizedField::Present(v) => Some(v),
            NormalizedField::Unavailable => None,
        }
    }

    pub fn as_ref(&self) -> NormalizedField<&T> {
        match self {
            NormalizedField::Present(v) => NormalizedField::Present(v),
            NormalizedField::Unavailable => NormalizedField::Unavailable,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> NormalizedField<U> {
        match self {
            NormalizedField::Present(v) => NormalizedField::Present(f(v)),
            NormalizedField::Unavailable => NormalizedField::Unavailable,
        }
    }
}

impl<T> From<Option<T>> for NormalizedField<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => NormalizedField::Present(v),
            None => NormalizedField::Unavailable,
        }
    }
}

/// How a single source fared, for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source reported a usable value
    Available { value: RawValue },
    /// The source reported a failure marker such as "Timeout"
    Failed { reason: String },
    /// Nothing was reported at all
    NotAvailable,
}

impl SourceStatus {
    pub fn label(&self) -> String {
        match self {
            SourceStatus::Available { value } => format!("✅ {}", value),
            SourceStatus::Failed { reason } => format!("❌ {}", reason),
            SourceStatus::NotAvailable => "❌ Not Available".to_string(),
        }
    }
}

/// One attempted source and how it fared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: String,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Best-estimate record reconciled from every attempted source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub value: Option<f64>,
    pub rent: Option<f64>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub sqft: Option<f64>,
    pub year_built: Option<f64>,
    pub taxes: Option<RawValue>,
    pub last_sold: Option<RawValue>,
    pub images: Vec<String>,
    pub successful_sources: Vec<String>,
    pub failed_sources: Vec<String>,
    pub data_quality_ratio: f64,
    /// Sources that contributed a present value, per field, in source order
    pub contributors: BTreeMap<Field, Vec<String>>,
    /// Per-source outcome in attempted order
    pub source_status: Vec<SourceOutcome>,
}

impl ConsensusRecord {
    pub fn total_sources(&self) -> usize {
        self.successful_sources.len() + self.failed_sources.len()
    }

    /// e.g. "3/5 sources successful"
    pub fn quality_summary(&self) -> String {
        format!(
            "{}/{} sources successful",
            self.successful_sources.len(),
            self.total_sources()
        )
    }

    pub fn is_low_confidence(&self) -> bool {
        self.successful_sources.len() < MIN_CONFIDENT_SOURCES
    }

    /// True when no numeric field could be reconciled at all.
    pub fn is_empty(&self) -> bool {
        Field::NUMERIC
            .iter()
            .chain(std::iter::once(&Field::YearBuilt))
            .all(|f| self.numeric(*f).is_none())
    }

    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Value => self.value,
            Field::Rent => self.rent,
            Field::Beds => self.beds,
            Field::Baths => self.baths,
            Field::Sqft => self.sqft,
            Field::YearBuilt => self.year_built,
            Field::Taxes | Field::LastSold => None,
        }
    }

    /// Year built rounded to a whole year, only if it falls in a sane range.
    pub fn plausible_year_built(&self) -> Option<i64> {
        let year = self.year_built?.round() as i64;
        (MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR)
            .contains(&year)
            .then_some(year)
    }

    pub fn status_of(&self, source: &str) -> Option<&SourceStatus> {
        self.source_status
            .iter()
            .find(|o| o.source == source)
            .map(|o| &o.status)
    }

    pub fn contributors_for(&self, field: Field) -> &[String] {
        self.contributors
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(successful: &[&str], failed: &[&str]) -> ConsensusRecord {
        ConsensusRecord {
            value: None,
            rent: None,
            beds: None,
            baths: None,
            sqft: None,
            year_built: None,
            taxes: None,
            last_sold: None,
            images: vec![],
            successful_sources: successful.iter().map(|s| s.to_string()).collect(),
            failed_sources: failed.iter().map(|s| s.to_string()).collect(),
            data_quality_ratio: 0.0,
            contributors: BTreeMap::new(),
            source_status: vec![],
        }
    }

    #[test]
    fn test_quality_summary() {
        let rec = record(&["zillow", "redfin", "homes"], &["realtor", "movoto"]);
        assert_eq!(rec.quality_summary(), "3/5 sources successful");
        assert!(!rec.is_low_confidence());
    }

    #[test]
    fn test_low_confidence_below_two_sources() {
        let rec = record(&["zillow"], &["realtor", "redfin", "homes", "movoto"]);
        assert!(rec.is_low_confidence());
    }

    #[test]
    fn test_plausible_year_built() {
        let mut rec = record(&[], &[]);
        rec.year_built = Some(1955.4);
        assert_eq!(rec.plausible_year_built(), Some(1955));

        rec.year_built = Some(0.0);
        assert_eq!(rec.plausible_year_built(), None);

        rec.year_built = Some(2150.0);
        assert_eq!(rec.plausible_year_built(), None);
    }

    #[test]
    fn test_empty_record() {
        let mut rec = record(&[], &["zillow"]);
        assert!(rec.is_empty());
        rec.sqft = Some(1200.0);
        assert!(!rec.is_empty());
    }

    #[test]
    fn test_normalized_field_conversions() {
        let present: NormalizedField<f64> = Some(3.0).into();
        assert!(present.is_present());
        assert_eq!(present.map(|v| v * 2.0).into_option(), Some(6.0));

        let missing: NormalizedField<f64> = None.into();
        assert_eq!(missing.into_option(), None);
    }

    #[test]
    fn test_source_status_label() {
        let status = SourceStatus::Failed {
            reason: "Timeout".to_string(),
        };
        assert_eq!(status.label(), "❌ Timeout");
        assert_eq!(SourceStatus::NotAvailable.label(), "❌ Not Available");
    }

    #[test]
    fn test_source_outcome_serializes_flat() {
        let outcome = SourceOutcome {
            source: "redfin".to_string(),
            status: SourceStatus::Failed {
                reason: "Failed".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"source": "redfin", "status": "failed", "reason": "Failed"})
        );
        let back: SourceOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_status_lookup_keeps_attempted_order() {
        let mut rec = record(&["zillow"], &["realtor"]);
        rec.source_status = vec![
            SourceOutcome {
                source: "zillow".to_string(),
                status: SourceStatus::NotAvailable,
            },
            SourceOutcome {
                source: "realtor".to_string(),
                status: SourceStatus::Failed {
                    reason: "Failed".to_string(),
                },
            },
        ];
        assert_eq!(rec.status_of("zillow"), Some(&SourceStatus::NotAvailable));
        assert!(rec.status_of("movoto").is_none());
        assert_eq!(rec.source_status[1].source, "realtor");
    }
}
