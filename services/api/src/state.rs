use std::sync::Arc;

use chrono::Duration;
use tracking::broker::{BrokerConfig, FanoutBroker};
use tracking::ingest::IngestionService;
use tracking::query::FleetQuery;
use tracking::registry::FleetRegistry;
use tracking::store::{LocationStore, StoreError};

use crate::config::ApiConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FleetRegistry>,
    pub store: Arc<LocationStore>,
    pub broker: Arc<FanoutBroker>,
    pub ingestion: Arc<IngestionService>,
    pub query: Arc<FleetQuery>,
    pub rate_limiter: Arc<RateLimiter>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wire the full pipeline. Opening a journal-backed store replays the
    /// journal, so startup cost grows with journal size.
    pub fn new(config: &ApiConfig) -> Result<Self, StoreError> {
        let registry = Arc::new(FleetRegistry::new());
        let store = Arc::new(match &config.journal_path {
            Some(path) => LocationStore::open(path)?,
            None => LocationStore::in_memory(),
        });
        let broker = Arc::new(FanoutBroker::new(BrokerConfig {
            queue_capacity: config.queue_capacity,
            drop_policy: config.drop_policy,
        }));
        let ingestion = Arc::new(IngestionService::new(
            registry.clone(),
            store.clone(),
            broker.clone(),
        ));
        let query = Arc::new(FleetQuery::with_freshness(
            registry.clone(),
            store.clone(),
            Duration::seconds(config.active_freshness_secs),
        ));

        Ok(Self {
            registry,
            store,
            broker,
            ingestion,
            query,
            rate_limiter: Arc::new(RateLimiter::new()),
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
        })
    }
}
