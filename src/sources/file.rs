use crate::models::RawObservation;
use crate::sources::traits::ObservationSource;
use crate::sources::types::PropertyQuery;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Source that reads a previously saved or hand-entered observation.
///
/// The path may contain a `{slug}` placeholder so one directory can hold
/// observations for many properties.
pub struct FileSource {
    id: String,
    path: String,
}

impl FileSource {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    fn path_for(&self, query: &PropertyQuery) -> String {
        match &query.address {
            Some(address) => self.path.replace("{slug}", &address.slug()),
            None => self.path.clone(),
        }
    }
}

#[async_trait]
impl ObservationSource for FileSource {
    async fn fetch(&self, query: &PropertyQuery) -> Result<RawObservation> {
        let path = self.path_for(query);
        debug!("Reading {} observation from {}", self.id, path);

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;
        let body: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path))?;

        RawObservation::from_value(&self.id, &body)
            .with_context(|| format!("{} does not hold an observation object", path))
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}
