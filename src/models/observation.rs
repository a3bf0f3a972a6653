use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::error::ScoutError;

/// Untyped field value as delivered by a source.
///
/// Sources hand over strings with currency and unit decoration, plain numbers,
/// `null`, or a failure sentinel. Anything else (booleans, arrays, objects) is
/// kept as `Invalid` so it can never be mistaken for a usable value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Invalid(Value),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Number(n) => match n.as_f64() {
                Some(f) => RawValue::Number(f),
                None => RawValue::Invalid(Value::Number(n)),
            },
            Value::String(s) => RawValue::Text(s),
            other => RawValue::Invalid(other),
        }
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        RawValue::from(value.clone())
    }
}

impl From<RawValue> for Value {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Null => Value::Null,
            RawValue::Number(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawValue::Text(s) => Value::String(s),
            RawValue::Invalid(v) => v,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "N/A"),
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Invalid(v) => write!(f, "{}", v),
        }
    }
}

/// Property fields a source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Value,
    Rent,
    Beds,
    Baths,
    Sqft,
    YearBuilt,
    Taxes,
    LastSold,
}

impl Field {
    /// Fields averaged across sources as floats.
    pub const NUMERIC: [Field; 5] = [Field::Value, Field::Rent, Field::Beds, Field::Baths, Field::Sqft];

    /// Fields taken verbatim from the first source that has them.
    pub const VERBATIM: [Field; 2] = [Field::Taxes, Field::LastSold];

    pub const ALL: [Field; 8] = [
        Field::Value,
        Field::Rent,
        Field::Beds,
        Field::Baths,
        Field::Sqft,
        Field::YearBuilt,
        Field::Taxes,
        Field::LastSold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Value => "value",
            Field::Rent => "rent",
            Field::Beds => "beds",
            Field::Baths => "baths",
            Field::Sqft => "sqft",
            Field::YearBuilt => "year_built",
            Field::Taxes => "taxes",
            Field::LastSold => "last_sold",
        }
    }
}

/// One source's view of one property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub source_id: String,
    #[serde(default)]
    pub value: RawValue,
    #[serde(default)]
    pub rent: RawValue,
    #[serde(default)]
    pub beds: RawValue,
    #[serde(default)]
    pub baths: RawValue,
    #[serde(default)]
    pub sqft: RawValue,
    #[serde(default, alias = "year")]
    pub year_built: RawValue,
    #[serde(default)]
    pub taxes: RawValue,
    #[serde(default)]
    pub last_sold: RawValue,
    #[serde(default, alias = "images")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawObservation {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// The object a source reports when its fetch failed outright.
    pub fn failed(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            value: RawValue::text("Failed"),
            rent: RawValue::text("Failed"),
            observed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Build an observation from an arbitrary JSON payload.
    ///
    /// Returns `None` when the payload is not an object. Unknown keys are
    /// ignored, missing keys read as `null`. Photo entries may be plain URL
    /// strings or objects carrying a `url`/`href`/`src` string; anything else
    /// is dropped.
    pub fn from_value(source_id: &str, payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;

        let field = |keys: &[&str]| -> RawValue {
            keys.iter()
                .find_map(|k| object.get(*k))
                .map(RawValue::from)
                .unwrap_or_default()
        };

        let photos = ["images", "photos"]
            .iter()
            .find_map(|k| object.get(*k))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let url = photo_url(item);
                        if url.is_none() {
                            debug!("Dropping photo entry from {}: {}", source_id, item);
                        }
                        url
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            source_id: source_id.to_string(),
            value: field(&["value"]),
            rent: field(&["rent"]),
            beds: field(&["beds"]),
            baths: field(&["baths"]),
            sqft: field(&["sqft"]),
            year_built: field(&["year_built", "year"]),
            taxes: field(&["taxes"]),
            last_sold: field(&["last_sold"]),
            photos,
            observed_at: None,
        })
    }

    pub fn get(&self, field: Field) -> &RawValue {
        match field {
            Field::Value => &self.value,
            Field::Rent => &self.rent,
            Field::Beds => &self.beds,
            Field::Baths => &self.baths,
            Field::Sqft => &self.sqft,
            Field::YearBuilt => &self.year_built,
            Field::Taxes => &self.taxes,
            Field::LastSold => &self.last_sold,
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<RawValue>) -> Self {
        let slot = match field {
            Field::Value => &mut self.value,
            Field::Rent => &mut self.rent,
            Field::Beds => &mut self.beds,
            Field::Baths => &mut self.baths,
            Field::Sqft => &mut self.sqft,
            Field::YearBuilt => &mut self.year_built,
            Field::Taxes => &mut self.taxes,
            Field::LastSold => &mut self.last_sold,
        };
        *slot = value.into();
        self
    }

    pub fn with_photos<I, S>(mut self, photos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.photos = photos.into_iter().map(Into::into).collect();
        self
    }
}

/// Every source attempted for one property, with whatever each delivered.
///
/// `attempted` fixes the iteration order used for first-available fields and
/// image concatenation. A source listed there but absent from `observations`
/// delivered nothing usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationSet {
    pub attempted: Vec<String>,
    pub observations: HashMap<String, RawObservation>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempted source and its observation.
    pub fn insert(&mut self, observation: RawObservation) {
        if !self.attempted.contains(&observation.source_id) {
            self.attempted.push(observation.source_id.clone());
        }
        self.observations
            .insert(observation.source_id.clone(), observation);
    }

    /// Record a source that was attempted but produced nothing.
    pub fn mark_missing(&mut self, source_id: impl Into<String>) {
        let source_id = source_id.into();
        if !self.attempted.contains(&source_id) {
            self.attempted.push(source_id);
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&RawObservation> {
        self.observations.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.attempted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted.is_empty()
    }

    /// Parse a `{ source_id: observation }` JSON mapping.
    ///
    /// The top level must be an object. Per-source payloads that are not
    /// objects still count as attempted but contribute nothing.
    pub fn from_json(payload: &Value) -> Result<Self, ScoutError> {
        let map: &Map<String, Value> = payload.as_object().ok_or_else(|| {
            ScoutError::InvalidInput(format!(
                "observation payload must be an object keyed by source, got {}",
                json_kind(payload)
            ))
        })?;

        let mut set = ObservationSet::new();
        for (source_id, entry) in map {
            match RawObservation::from_value(source_id, entry) {
                Some(observation) => set.insert(observation),
                None => set.mark_missing(source_id.clone()),
            }
        }
        Ok(set)
    }

    /// Parse a JSON mapping against a fixed list of expected sources.
    ///
    /// Expected sources missing from the payload are recorded as attempted
    /// and failed; sources in the payload but not expected are appended after
    /// them in payload order.
    pub fn from_json_with_sources(payload: &Value, expected: &[String]) -> Result<Self, ScoutError> {
        let parsed = Self::from_json(payload)?;

        let mut set = ObservationSet::new();
        for source_id in expected {
            match parsed.observations.get(source_id) {
                Some(observation) => set.insert(observation.clone()),
                None => set.mark_missing(source_id.clone()),
            }
        }
        for source_id in &parsed.attempted {
            if expected.contains(source_id) {
                continue;
            }
            match parsed.observations.get(source_id) {
                Some(observation) => set.insert(observation.clone()),
                None => set.mark_missing(source_id.clone()),
            }
        }
        Ok(set)
    }

    /// Reject structurally unusable sets before aggregation.
    pub fn validate(&self) -> Result<(), ScoutError> {
        if self.attempted.is_empty() {
            return Err(ScoutError::InvalidInput(
                "no sources were attempted".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source_id in &self.attempted {
            if source_id.trim().is_empty() {
                return Err(ScoutError::InvalidInput(
                    "source identifier must not be empty".to_string(),
                ));
            }
            if !seen.insert(source_id.as_str()) {
                return Err(ScoutError::InvalidInput(format!(
                    "source '{}' attempted more than once",
                    source_id
                )));
            }
        }

        for source_id in self.observations.keys() {
            if !seen.contains(source_id.as_str()) {
                return Err(ScoutError::InvalidInput(format!(
                    "observation for '{}' has no matching attempted source",
                    source_id
                )));
            }
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn photo_url(item: &Value) -> Option<String> {
    match item {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => ["url", "href", "src"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_value_from_json() {
        assert_eq!(RawValue::from(json!(null)), RawValue::Null);
        assert_eq!(RawValue::from(json!(12)), RawValue::Number(12.0));
        assert_eq!(RawValue::from(json!("$1,200")), RawValue::text("$1,200"));
        assert!(matches!(RawValue::from(json!(true)), RawValue::Invalid(_)));
        assert!(matches!(RawValue::from(json!([1, 2])), RawValue::Invalid(_)));
    }

    #[test]
    fn test_observation_from_value_accepts_legacy_keys() {
        let payload = json!({
            "value": "$250,000",
            "year": 1987,
            "images": ["a.jpg", 3, "b.jpg"],
            "unknown": "ignored"
        });

        let obs = RawObservation::from_value("zillow", &payload).unwrap();

        assert_eq!(obs.source_id, "zillow");
        assert_eq!(obs.value, RawValue::text("$250,000"));
        assert_eq!(obs.year_built, RawValue::Number(1987.0));
        assert_eq!(obs.rent, RawValue::Null);
        assert_eq!(obs.photos, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_photo_objects_yield_their_url() {
        let payload = json!({
            "value": 150000,
            "photos": [
                {"url": "https://img.example/1.jpg", "caption": "front"},
                {"href": "https://img.example/2.jpg"},
                {"caption": "no link"},
                "https://img.example/3.jpg"
            ]
        });

        let obs = RawObservation::from_value("realtor", &payload).unwrap();

        assert_eq!(
            obs.photos,
            vec![
                "https://img.example/1.jpg",
                "https://img.example/2.jpg",
                "https://img.example/3.jpg"
            ]
        );
    }

    #[test]
    fn test_observation_from_non_object_is_none() {
        assert!(RawObservation::from_value("redfin", &json!("Failed")).is_none());
        assert!(RawObservation::from_value("redfin", &json!(null)).is_none());
    }

    #[test]
    fn test_observation_set_keeps_payload_order() {
        let payload = json!({
            "zillow": {"value": 1},
            "redfin": "garbage",
            "homes": {"value": 2}
        });

        let set = ObservationSet::from_json(&payload).unwrap();

        assert_eq!(set.attempted, vec!["zillow", "redfin", "homes"]);
        assert!(set.get("redfin").is_none());
        assert!(set.get("homes").is_some());
    }

    #[test]
    fn test_observation_set_rejects_non_object_payload() {
        let err = ObservationSet::from_json(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ScoutError::InvalidInput(_)));
    }

    #[test]
    fn test_observation_set_with_expected_sources() {
        let payload = json!({
            "redfin": {"value": 5},
            "extra": {"value": 6}
        });
        let expected = vec!["zillow".to_string(), "redfin".to_string()];

        let set = ObservationSet::from_json_with_sources(&payload, &expected).unwrap();

        assert_eq!(set.attempted, vec!["zillow", "redfin", "extra"]);
        assert!(set.get("zillow").is_none());
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_set() {
        assert!(ObservationSet::new().validate().is_err());
    }

    #[test]
    fn test_validate_rejects_orphan_observation() {
        let mut set = ObservationSet::new();
        set.insert(RawObservation::new("zillow"));
        set.observations
            .insert("ghost".to_string(), RawObservation::new("ghost"));

        assert!(set.validate().is_err());
    }

    #[test]
    fn test_failed_observation_uses_sentinels() {
        let obs = RawObservation::failed("movoto");
        assert_eq!(obs.value.as_text(), Some("Failed"));
        assert_eq!(obs.rent.as_text(), Some("Failed"));
        assert!(obs.beds.is_null());
    }
}
