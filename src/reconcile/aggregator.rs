//! Folds every source's observation into one consensus record.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{ConsensusRecord, Field, ObservationSet, RawValue, SourceOutcome, SourceStatus};

use super::normalizer::{is_parse_sentinel, NormalizedObservation};

/// Images kept on the consensus record
pub const IMAGE_CAP: usize = 10;

/// `value` markers that disqualify a source from counting as successful.
///
/// Deliberately distinct from [`super::normalizer::PARSE_SENTINELS`]: status
/// strings like "No property found" fail a source without being parse noise,
/// while "Timeout" or "API Error" do not.
pub const FAILURE_SENTINELS: [&str; 7] = [
    "Failed",
    "N/A",
    "API N/A",
    "Dataset N/A",
    "No property found",
    "Trigger failed",
    "Processing...",
];

pub fn is_failure_sentinel(text: &str) -> bool {
    FAILURE_SENTINELS.contains(&text)
}

/// Whether a source's raw `value` qualifies it as successful.
pub fn is_successful_value(raw: &RawValue) -> bool {
    match raw {
        RawValue::Null => false,
        RawValue::Text(text) => !is_failure_sentinel(text),
        RawValue::Number(_) | RawValue::Invalid(_) => true,
    }
}

/// Source aggregator
#[derive(Debug, Clone)]
pub struct Aggregator {
    image_cap: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            image_cap: IMAGE_CAP,
        }
    }

    pub fn with_image_cap(image_cap: usize) -> Self {
        Self { image_cap }
    }

    /// Reconcile an observation set into a [`ConsensusRecord`].
    ///
    /// Only a structurally invalid set (no sources, duplicated ids, orphan
    /// observations) is an error. Absent or all-sentinel sources simply land
    /// in `failed_sources`.
    pub fn aggregate(&self, set: &ObservationSet) -> Result<ConsensusRecord> {
        set.validate()?;

        let normalized: Vec<(&str, Option<NormalizedObservation>)> = set
            .attempted
            .iter()
            .map(|id| {
                let obs = set.get(id).map(NormalizedObservation::from_raw);
                (id.as_str(), obs)
            })
            .collect();

        let mut contributors: BTreeMap<Field, Vec<String>> = BTreeMap::new();

        let mut numeric = BTreeMap::new();
        for field in Field::NUMERIC.iter().chain(std::iter::once(&Field::YearBuilt)) {
            let mut present = Vec::new();
            for (id, obs) in &normalized {
                if let Some(v) = obs.as_ref().and_then(|o| o.numeric(*field)) {
                    present.push(v);
                    contributors.entry(*field).or_default().push(id.to_string());
                }
            }
            numeric.insert(*field, mean(&present));
        }

        let mut verbatim = BTreeMap::new();
        for field in Field::VERBATIM {
            let first = normalized.iter().find_map(|(id, obs)| {
                obs.as_ref()
                    .and_then(|o| o.verbatim(field))
                    .map(|v| (id.to_string(), v.clone()))
            });
            if let Some((id, value)) = first {
                contributors.entry(field).or_default().push(id);
                verbatim.insert(field, value);
            }
        }

        let images: Vec<String> = normalized
            .iter()
            .filter_map(|(_, obs)| obs.as_ref())
            .flat_map(|o| o.photos.iter().cloned())
            .take(self.image_cap)
            .collect();

        let mut successful_sources = Vec::new();
        let mut failed_sources = Vec::new();
        let mut source_status = Vec::with_capacity(set.attempted.len());

        for id in &set.attempted {
            let raw_value = set.get(id).map(|o| &o.value);
            let successful = raw_value.map(is_successful_value).unwrap_or(false);

            if successful {
                successful_sources.push(id.clone());
            } else {
                debug!("Source {} did not report a usable value", id);
                failed_sources.push(id.clone());
            }
            source_status.push(SourceOutcome {
                source: id.clone(),
                status: classify_status(raw_value),
            });
        }

        let data_quality_ratio = successful_sources.len() as f64 / set.attempted.len() as f64;

        if successful_sources.len() < crate::models::MIN_CONFIDENT_SOURCES {
            warn!(
                "⚠️ Only {}/{} sources successful - consensus reliability may be low",
                successful_sources.len(),
                set.attempted.len()
            );
        }

        Ok(ConsensusRecord {
            value: numeric[&Field::Value],
            rent: numeric[&Field::Rent],
            beds: numeric[&Field::Beds],
            baths: numeric[&Field::Baths],
            sqft: numeric[&Field::Sqft],
            year_built: numeric[&Field::YearBuilt],
            taxes: verbatim.remove(&Field::Taxes),
            last_sold: verbatim.remove(&Field::LastSold),
            images,
            successful_sources,
            failed_sources,
            data_quality_ratio,
            contributors,
            source_status,
        })
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn classify_status(raw_value: Option<&RawValue>) -> SourceStatus {
    match raw_value {
        None | Some(RawValue::Null) => SourceStatus::NotAvailable,
        Some(RawValue::Text(text)) if is_failure_sentinel(text) || is_parse_sentinel(text) => {
            if text == "N/A" || text == "API N/A" || text == "Dataset N/A" {
                SourceStatus::NotAvailable
            } else {
                SourceStatus::Failed {
                    reason: text.clone(),
                }
            }
        }
        Some(value) => SourceStatus::Available {
            value: value.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawObservation;
    use serde_json::json;

    const SOURCES: [&str; 5] = ["zillow", "realtor", "redfin", "homes", "movoto"];

    fn set_from(payload: serde_json::Value) -> ObservationSet {
        ObservationSet::from_json(&payload).unwrap()
    }

    #[test]
    fn test_mean_of_present_values() {
        let set = set_from(json!({
            "zillow": {"value": 100000},
            "realtor": {"value": "105,000"},
            "redfin": {"value": null},
            "homes": {"value": "Failed"},
            "movoto": {"value": "$98,000"}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.value, Some(101000.0));
        assert_eq!(record.successful_sources, vec!["zillow", "realtor", "movoto"]);
        assert_eq!(record.failed_sources, vec!["redfin", "homes"]);
        assert!((record.data_quality_ratio - 0.6).abs() < 1e-9);
        assert_eq!(
            record.contributors_for(Field::Value),
            &["zillow".to_string(), "realtor".to_string(), "movoto".to_string()]
        );
    }

    #[test]
    fn test_mean_is_order_independent() {
        let forward = set_from(json!({
            "a": {"rent": 1000}, "b": {"rent": 1500}, "c": {"rent": "$2,000/mo"}
        }));
        let reverse = set_from(json!({
            "c": {"rent": "$2,000/mo"}, "b": {"rent": 1500}, "a": {"rent": 1000}
        }));

        let agg = Aggregator::new();
        assert_eq!(
            agg.aggregate(&forward).unwrap().rent,
            agg.aggregate(&reverse).unwrap().rent
        );
        assert_eq!(agg.aggregate(&forward).unwrap().rent, Some(1500.0));
    }

    #[test]
    fn test_all_sources_failing_yields_null() {
        let set = set_from(json!({
            "zillow": {"value": "Failed", "rent": "Failed"},
            "redfin": {"value": "No property found", "rent": "N/A"}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.value, None);
        assert_eq!(record.rent, None);
        assert!(record.is_empty());
        assert!(record.successful_sources.is_empty());
        assert_eq!(record.data_quality_ratio, 0.0);
    }

    #[test]
    fn test_missing_source_equals_all_sentinel_source() {
        let mut with_missing = ObservationSet::new();
        with_missing.insert(RawObservation::new("zillow").with(Field::Value, 200000.0));
        with_missing.mark_missing("redfin");

        let mut with_failed = ObservationSet::new();
        with_failed.insert(RawObservation::new("zillow").with(Field::Value, 200000.0));
        with_failed.insert(RawObservation::failed("redfin"));

        let agg = Aggregator::new();
        let a = agg.aggregate(&with_missing).unwrap();
        let b = agg.aggregate(&with_failed).unwrap();

        assert_eq!(a.value, b.value);
        assert_eq!(a.failed_sources, vec!["redfin"]);
        assert_eq!(a.failed_sources, b.failed_sources);
        assert_eq!(a.successful_sources, b.successful_sources);
    }

    #[test]
    fn test_malformed_source_counts_as_failed() {
        let set = set_from(json!({
            "zillow": {"value": 150000},
            "realtor": "Browser Failed",
            "redfin": [1, 2, 3]
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.value, Some(150000.0));
        assert_eq!(record.failed_sources, vec!["realtor", "redfin"]);
    }

    #[test]
    fn test_partition_of_sources() {
        let set = set_from(json!({
            "zillow": {"value": "Timeout"},
            "realtor": {"value": "API N/A"},
            "redfin": {"value": "No data found"},
            "homes": {"value": "Processing..."},
            "movoto": {}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        let mut union: Vec<String> = record
            .successful_sources
            .iter()
            .chain(record.failed_sources.iter())
            .cloned()
            .collect();
        union.sort();
        let mut expected: Vec<String> = SOURCES.iter().map(|s| s.to_string()).collect();
        expected.sort();

        assert_eq!(union, expected);
        assert!(record
            .successful_sources
            .iter()
            .all(|s| !record.failed_sources.contains(s)));
    }

    #[test]
    fn test_classification_vocabulary_differs_from_parsing() {
        // "Timeout" fails parsing but is not a classification sentinel
        let set = set_from(json!({
            "zillow": {"value": "Timeout"},
            "redfin": {"value": "No property found"}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.value, None);
        assert_eq!(record.successful_sources, vec!["zillow"]);
        assert_eq!(record.failed_sources, vec!["redfin"]);
        assert_eq!(
            record.status_of("zillow"),
            Some(&SourceStatus::Failed {
                reason: "Timeout".to_string()
            })
        );
    }

    #[test]
    fn test_first_available_verbatim_fields() {
        let set = set_from(json!({
            "zillow": {"taxes": "N/A", "last_sold": null},
            "realtor": {"taxes": "$3,120", "last_sold": "Failed"},
            "redfin": {"taxes": 2800, "last_sold": "2019-06-14"}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.taxes, Some(RawValue::text("$3,120")));
        assert_eq!(record.last_sold, Some(RawValue::text("2019-06-14")));
        assert_eq!(record.contributors_for(Field::Taxes), &["realtor".to_string()]);
    }

    #[test]
    fn test_images_concatenate_and_cap() {
        let photos = |prefix: &str, n: usize| -> Vec<String> {
            (0..n).map(|i| format!("{}-{}.jpg", prefix, i)).collect()
        };
        let mut set = ObservationSet::new();
        set.insert(RawObservation::new("zillow").with_photos(photos("z", 4)));
        set.insert(RawObservation::new("redfin").with_photos(vec!["z-0.jpg".to_string()]));
        set.insert(RawObservation::new("homes").with_photos(photos("h", 8)));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.images.len(), IMAGE_CAP);
        assert_eq!(record.images[0], "z-0.jpg");
        assert_eq!(record.images[4], "z-0.jpg");
        assert_eq!(record.images[9], "h-4.jpg");
    }

    #[test]
    fn test_year_built_mean() {
        let set = set_from(json!({
            "zillow": {"year": "1990"},
            "redfin": {"year_built": 1995.7}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(record.year_built, Some(1992.5));
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let err = Aggregator::new().aggregate(&ObservationSet::new());
        assert!(err.is_err());
    }

    #[test]
    fn test_successful_value_rules() {
        assert!(is_successful_value(&RawValue::Number(0.0)));
        assert!(is_successful_value(&RawValue::text("Call for price")));
        assert!(!is_successful_value(&RawValue::Null));
        for sentinel in FAILURE_SENTINELS {
            assert!(!is_successful_value(&RawValue::text(sentinel)));
        }
    }

    #[test]
    fn test_source_status_follows_attempted_order() {
        let set = set_from(json!({
            "zillow": {"value": 100000},
            "realtor": {"value": "Failed"},
            "redfin": {"value": 99000},
            "homes": {"value": null},
            "movoto": {"value": "Timeout"}
        }));

        let record = Aggregator::new().aggregate(&set).unwrap();

        let order: Vec<&str> = record.source_status.iter().map(|o| o.source.as_str()).collect();
        assert_eq!(order, SOURCES);
        assert_eq!(record.status_of("homes"), Some(&SourceStatus::NotAvailable));
    }
}
