use crate::models::RawObservation;
use crate::sources::traits::ObservationSource;
use crate::sources::types::PropertyQuery;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source backed by a JSON data API.
///
/// The endpoint is called with the property's address as an `address` query
/// parameter; a `{slug}` placeholder in the endpoint is replaced with the
/// address slug first. The response body must be a JSON object using the
/// observation field names (`value`, `rent`, `beds`, ...).
pub struct HttpSource {
    id: String,
    endpoint: String,
    client: Client,
}

impl HttpSource {
    /// Create a new HTTP source with a 30 second request timeout
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(id, endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("property-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            id: id.into(),
            endpoint: endpoint.into(),
            client,
        })
    }

    fn url_for(&self, query: &PropertyQuery) -> String {
        let slug = match &query.address {
            Some(address) => address.slug(),
            None => query.canonical_address().replace(' ', "-"),
        };
        self.endpoint.replace("{slug}", &slug)
    }

    /// Turn a response body into an observation for this source
    fn parse_body(&self, body: &Value) -> Result<RawObservation> {
        let mut observation = RawObservation::from_value(&self.id, body).with_context(|| {
            format!("{} returned a non-object observation", self.id)
        })?;
        observation.observed_at = Some(Utc::now());
        Ok(observation)
    }
}

#[async_trait]
impl ObservationSource for HttpSource {
    async fn fetch(&self, query: &PropertyQuery) -> Result<RawObservation> {
        let url = self.url_for(query);
        info!("Fetching {} data for {}", self.id, query.display_address());
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("address", query.display_address())])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} data", self.id))?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", self.id, response.status());
            anyhow::bail!("Failed to fetch {} data: {}", self.id, response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to read response body")?;

        self.parse_body(&body)
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawValue;
    use serde_json::json;

    #[test]
    fn test_url_substitutes_slug() {
        let source = HttpSource::new("zillow", "http://localhost:9000/homedetails/{slug}").unwrap();
        let query = PropertyQuery::new("1841 Marks Ave, Akron, OH 44305");

        assert_eq!(
            source.url_for(&query),
            "http://localhost:9000/homedetails/1841-marks-ave-akron-oh-44305"
        );
    }

    #[test]
    fn test_parse_body() {
        let source = HttpSource::new("redfin", "http://localhost:9000/lookup").unwrap();

        let obs = source
            .parse_body(&json!({"value": "$199,900", "beds": 3}))
            .unwrap();

        assert_eq!(obs.source_id, "redfin");
        assert_eq!(obs.value, RawValue::text("$199,900"));
        assert!(obs.observed_at.is_some());
        assert!(source.parse_body(&json!("No property found")).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let source = HttpSource::with_timeout(
            "homes",
            "http://127.0.0.1:9/lookup",
            Duration::from_millis(500),
        )
        .unwrap();

        let result = source.fetch(&PropertyQuery::default()).await;

        assert!(result.is_err());
    }
}
