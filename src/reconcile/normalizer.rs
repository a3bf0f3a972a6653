//! Field normalization.
//!
//! Every function here is total: whatever a source hands over, the result is
//! either a typed value or `Unavailable`.

use crate::models::{Field, NormalizedField, RawObservation, RawValue};

/// Markers that mean a field could not be obtained.
///
/// Matched exactly and case-sensitively; a sentinel must never read as zero.
pub const PARSE_SENTINELS: [&str; 8] = [
    "Failed",
    "N/A",
    "No data found",
    "API Error",
    "Trigger failed",
    "Timeout",
    "Processing...",
    "Dataset N/A",
];

pub fn is_parse_sentinel(text: &str) -> bool {
    PARSE_SENTINELS.contains(&text)
}

/// Parse a continuous numeric field (`value`, `rent`, `beds`, `baths`, `sqft`).
///
/// Strings lose `$` and `,`, anything after the first `/`, and anything after
/// the first whitespace-delimited token: `"$1,250/month"` becomes `1250.0`
/// and `"3 bed"` becomes `3.0`.
pub fn normalize_numeric(raw: &RawValue) -> NormalizedField<f64> {
    match raw {
        RawValue::Null | RawValue::Invalid(_) => NormalizedField::Unavailable,
        RawValue::Number(n) if n.is_finite() => NormalizedField::Present(*n),
        RawValue::Number(_) => NormalizedField::Unavailable,
        RawValue::Text(text) if is_parse_sentinel(text) => NormalizedField::Unavailable,
        RawValue::Text(text) => parse_decorated_number(text).into(),
    }
}

/// Parse `year_built`: the numeric pipeline, truncated to a whole year.
///
/// No range check happens here; `0` or `3021` come through as parsed.
pub fn normalize_year(raw: &RawValue) -> NormalizedField<i64> {
    normalize_numeric(raw).map(|year| year.trunc() as i64)
}

/// Pass a verbatim field (`taxes`, `last_sold`) through untouched.
pub fn normalize_verbatim(raw: &RawValue) -> NormalizedField<RawValue> {
    match raw {
        RawValue::Null | RawValue::Invalid(_) => NormalizedField::Unavailable,
        RawValue::Number(n) if !n.is_finite() => NormalizedField::Unavailable,
        RawValue::Text(text) if is_parse_sentinel(text) => NormalizedField::Unavailable,
        other => NormalizedField::Present(other.clone()),
    }
}

fn parse_decorated_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(['$', ','], "");
    let before_rate = cleaned.split('/').next().unwrap_or_default();
    let token = before_rate.split_whitespace().next()?;
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// One observation with every field parsed
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedObservation {
    pub source_id: String,
    pub value: NormalizedField<f64>,
    pub rent: NormalizedField<f64>,
    pub beds: NormalizedField<f64>,
    pub baths: NormalizedField<f64>,
    pub sqft: NormalizedField<f64>,
    pub year_built: NormalizedField<i64>,
    pub taxes: NormalizedField<RawValue>,
    pub last_sold: NormalizedField<RawValue>,
    pub photos: Vec<String>,
}

impl NormalizedObservation {
    pub fn from_raw(raw: &RawObservation) -> Self {
        Self {
            source_id: raw.source_id.clone(),
            value: normalize_numeric(&raw.value),
            rent: normalize_numeric(&raw.rent),
            beds: normalize_numeric(&raw.beds),
            baths: normalize_numeric(&raw.baths),
            sqft: normalize_numeric(&raw.sqft),
            year_built: normalize_year(&raw.year_built),
            taxes: normalize_verbatim(&raw.taxes),
            last_sold: normalize_verbatim(&raw.last_sold),
            photos: raw.photos.clone(),
        }
    }

    /// Numeric view of a field; `year_built` is widened back to a float.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Value => self.value.as_ref().into_option().copied(),
            Field::Rent => self.rent.as_ref().into_option().copied(),
            Field::Beds => self.beds.as_ref().into_option().copied(),
            Field::Baths => self.baths.as_ref().into_option().copied(),
            Field::Sqft => self.sqft.as_ref().into_option().copied(),
            Field::YearBuilt => self.year_built.as_ref().into_option().map(|y| *y as f64),
            Field::Taxes | Field::LastSold => None,
        }
    }

    pub fn verbatim(&self, field: Field) -> Option<&RawValue> {
        match field {
            Field::Taxes => self.taxes.as_ref().into_option(),
            Field::LastSold => self.last_sold.as_ref().into_option(),
            _ => None,
        }
    }
}
