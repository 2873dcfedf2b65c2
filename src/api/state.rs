use std::sync::Arc;
use std::time::Duration;

use crate::services::{RecommendationEngine, RecommendationStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(engine: RecommendationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// State over a store with no result cache
    pub fn from_store(store: Arc<dyn RecommendationStore>, query_timeout: Duration) -> Self {
        Self::new(RecommendationEngine::new(store, query_timeout))
    }
}
