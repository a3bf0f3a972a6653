use serde::{Deserialize, Serialize};

use super::address::Address;

/// Sources queried by default, in consensus iteration order
pub const DEFAULT_SOURCES: [&str; 5] = ["zillow", "realtor", "redfin", "homes", "movoto"];

/// What to look up: one property, identified by its address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyQuery {
    /// Address as typed by the user
    pub raw_address: String,
    /// Parsed address, if the input could be parsed
    pub address: Option<Address>,
}

impl PropertyQuery {
    pub fn new(raw_address: impl Into<String>) -> Self {
        let raw_address = raw_address.into();
        let address = Address::parse(&raw_address);
        Self {
            raw_address,
            address,
        }
    }

    /// Canonical form of the address; falls back to the trimmed, lowercased
    /// input when it could not be parsed.
    pub fn canonical_address(&self) -> String {
        match &self.address {
            Some(address) => address.canonical(),
            None => self
                .raw_address
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }

    /// Display form of the address
    pub fn display_address(&self) -> String {
        match &self.address {
            Some(address) => address.to_string(),
            None => self.raw_address.trim().to_string(),
        }
    }
}

impl Default for PropertyQuery {
    fn default() -> Self {
        Self::new("1841 Marks Ave, Akron, OH 44305")
    }
}
