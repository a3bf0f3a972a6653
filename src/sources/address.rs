use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A US street address split into its parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    /// Two-letter state code, uppercased
    pub state: String,
    pub zip: Option<String>,
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\d+\s+[\w\s.]+?),\s*([\w\s]+?),\s*([A-Z]{2})\b\s*(\d{5}(?:-\d{4})?)?")
            .expect("address pattern is valid")
    })
}

impl Address {
    /// Parse `"1841 Marks Ave, Akron, OH 44305"` style input.
    ///
    /// The ZIP code is optional. Returns `None` when the street number, city
    /// or state cannot be found.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = address_pattern().captures(input.trim())?;

        Some(Self {
            street: collapse_whitespace(caps.get(1)?.as_str()),
            city: collapse_whitespace(caps.get(2)?.as_str()),
            state: caps.get(3)?.as_str().to_uppercase(),
            zip: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    /// Lowercased single-line form used for cache keys.
    pub fn canonical(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// `street-city-state-zip` slug, as listing sites put in their URLs.
    pub fn slug(&self) -> String {
        let mut parts = vec![self.street.as_str(), self.city.as_str(), self.state.as_str()];
        if let Some(zip) = &self.zip {
            parts.push(zip);
        }
        parts
            .join(" ")
            .split_whitespace()
            .map(|p| p.trim_matches('.').to_lowercase())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.street, self.city, self.state)?;
        if let Some(zip) = &self.zip {
            write!(f, " {}", zip)?;
        }
        Ok(())
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
