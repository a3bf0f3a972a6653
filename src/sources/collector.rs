use crate::models::{ObservationSet, RawObservation};
use crate::sources::cache::{fingerprint, SnapshotCache};
use crate::sources::traits::ObservationSource;
use crate::sources::types::PropertyQuery;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Attempts per source unless configured otherwise
pub const DEFAULT_ATTEMPTS: u32 = 3;
/// Delay before the first retry; doubled after every failed attempt
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Runs every configured source concurrently for one property.
///
/// Each source gets its own task and its own timeout, which covers all of its
/// retries. Whatever happens to a source, the resulting set lists it as
/// attempted: errors, timeouts and panics all become a failed observation.
pub struct Collector {
    sources: Vec<Arc<dyn ObservationSource>>,
    timeout: Duration,
    attempts: u32,
    backoff: Duration,
    cache: Option<SnapshotCache>,
}

impl Collector {
    pub fn new(sources: Vec<Arc<dyn ObservationSource>>, timeout: Duration) -> Self {
        Self {
            sources,
            timeout,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            cache: None,
        }
    }

    /// Retry each failing source up to `attempts` times in total.
    pub fn with_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.source_id()).collect()
    }

    pub async fn collect(&self, query: &PropertyQuery) -> ObservationSet {
        let key = fingerprint(query, &self.source_ids());
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            info!("📦 Using cached observations for {}", query.display_address());
            return cached;
        }

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.clone();
                let timeout = self.timeout;
                let attempts = self.attempts;
                let backoff = self.backoff;
                tokio::spawn(async move {
                    tokio::time::timeout(timeout, fetch_with_retry(source, query, attempts, backoff))
                        .await
                })
            })
            .collect();

        let mut set = ObservationSet::new();
        for (source, handle) in self.sources.iter().zip(handles) {
            let source_id = source.source_id();
            let observation = match handle.await {
                Ok(Ok(Ok(mut observation))) => {
                    observation.source_id = source_id.to_string();
                    observation
                }
                Ok(Ok(Err(e))) => {
                    warn!("Source {} failed: {:#}", source_id, e);
                    RawObservation::failed(source_id)
                }
                Ok(Err(_)) => {
                    warn!("Source {} timed out after {:?}", source_id, self.timeout);
                    RawObservation::failed(source_id)
                }
                Err(e) => {
                    warn!("Source {} task aborted: {}", source_id, e);
                    RawObservation::failed(source_id)
                }
            };
            set.insert(observation);
        }

        info!("Collected observations from {} sources", set.len());

        if let Some(cache) = &self.cache {
            cache.insert(key, set.clone());
        }
        set
    }
}

async fn fetch_with_retry(
    source: Arc<dyn ObservationSource>,
    query: PropertyQuery,
    attempts: u32,
    mut backoff: Duration,
) -> anyhow::Result<RawObservation> {
    let mut attempt = 1;
    loop {
        match source.fetch(&query).await {
            Ok(observation) => return Ok(observation),
            Err(e) if attempt < attempts => {
                warn!(
                    "Attempt {}/{} for {} failed: {:#}. Retrying in {:?}",
                    attempt,
                    attempts,
                    source.source_id(),
                    e,
                    backoff
                );
                sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, RawValue};
    use crate::reconcile::Aggregator;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Value(f64),
        FailThenValue(usize, f64),
        Error,
        Hang,
        Panic,
    }

    struct MockSource {
        id: String,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new(id: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ObservationSource for MockSource {
        async fn fetch(&self, _query: &PropertyQuery) -> Result<RawObservation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Value(v) => Ok(RawObservation::new("wrong-id").with(Field::Value, v)),
                Behavior::FailThenValue(failures, v) => {
                    if self.calls.load(Ordering::SeqCst) <= failures {
                        anyhow::bail!("connection reset");
                    }
                    Ok(RawObservation::new(&self.id).with(Field::Value, v))
                }
                Behavior::Error => anyhow::bail!("blocked"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(RawObservation::new(&self.id))
                }
                Behavior::Panic => panic!("selector changed"),
            }
        }

        fn source_id(&self) -> &str {
            &self.id
        }
    }

    #[tokio::test]
    async fn test_every_source_is_accounted_for() {
        let sources: Vec<Arc<dyn ObservationSource>> = vec![
            MockSource::new("zillow", Behavior::Value(100_000.0)),
            MockSource::new("realtor", Behavior::Error),
            MockSource::new("redfin", Behavior::Hang),
            MockSource::new("homes", Behavior::Panic),
            MockSource::new("movoto", Behavior::Value(104_000.0)),
        ];
        let collector =
            Collector::new(sources, Duration::from_millis(200)).with_retries(1, Duration::ZERO);

        let set = collector.collect(&PropertyQuery::default()).await;

        assert_eq!(set.attempted, vec!["zillow", "realtor", "redfin", "homes", "movoto"]);
        assert_eq!(set.get("zillow").unwrap().value, RawValue::Number(100_000.0));
        for failed in ["realtor", "redfin", "homes"] {
            assert_eq!(set.get(failed).unwrap().value, RawValue::text("Failed"));
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let flaky = MockSource::new("realtor", Behavior::FailThenValue(2, 104_000.0));
        let sources: Vec<Arc<dyn ObservationSource>> = vec![
            MockSource::new("zillow", Behavior::Value(100_000.0)),
            flaky.clone(),
        ];
        let collector =
            Collector::new(sources, Duration::from_secs(5)).with_retries(3, Duration::from_millis(5));

        let set = collector.collect(&PropertyQuery::default()).await;
        let record = Aggregator::new().aggregate(&set).unwrap();

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.successful_sources, vec!["zillow", "realtor"]);
        assert_eq!(record.value, Some(102_000.0));
    }

    #[tokio::test]
    async fn test_retries_give_up_after_last_attempt() {
        let broken = MockSource::new("redfin", Behavior::Error);
        let sources: Vec<Arc<dyn ObservationSource>> = vec![broken.clone()];
        let collector =
            Collector::new(sources, Duration::from_secs(5)).with_retries(2, Duration::from_millis(5));

        let set = collector.collect(&PropertyQuery::default()).await;

        assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
        assert_eq!(set.get("redfin").unwrap().value, RawValue::text("Failed"));
    }

    #[tokio::test]
    async fn test_cache_skips_second_fetch() {
        let zillow = MockSource::new("zillow", Behavior::Value(1.0));
        let sources: Vec<Arc<dyn ObservationSource>> = vec![zillow.clone()];
        let cache = SnapshotCache::new(chrono::Duration::minutes(5));
        let collector = Collector::new(sources, Duration::from_secs(1)).with_cache(cache.clone());

        let query = PropertyQuery::default();
        let first = collector.collect(&query).await;
        let second = collector.collect(&query).await;

        assert_eq!(zillow.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.attempted, second.attempted);
        assert_eq!(cache.len(), 1);
    }
}
