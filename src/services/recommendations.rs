use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Identity, Limit, RecommendedProduct},
    services::stores::RecommendationStore,
};

/// Which ranking produced a recommendation list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationSource {
    Personalized,
    Popular,
}

impl RecommendationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationSource::Personalized => "personalized",
            RecommendationSource::Popular => "popular",
        }
    }
}

/// Generates product recommendations from the shared event log.
///
/// Tries co-occurrence scoring for the shopper's identity first and falls back
/// to global popularity when that yields nothing. Each store round-trip is
/// bounded by `query_timeout`; a timeout or store error fails the whole call
/// without returning partial results.
#[derive(Clone)]
pub struct RecommendationEngine {
    store: Arc<dyn RecommendationStore>,
    cache: Option<Cache>,
    query_timeout: Duration,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn RecommendationStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            cache: None,
            query_timeout,
        }
    }

    /// Enables the short-lived result cache
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn get_recommendations(
        &self,
        identity: &Identity,
        limit: Limit,
    ) -> AppResult<Vec<RecommendedProduct>> {
        let key = CacheKey::recommendations(identity, limit);

        if let Some(cache) = &self.cache {
            let read = cache.get_from_cache::<Vec<RecommendedProduct>>(&key);
            match tokio::time::timeout(self.query_timeout, read).await {
                Ok(Ok(Some(items))) => {
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(items);
                }
                Ok(Ok(None)) => tracing::debug!(key = %key, "Cache miss"),
                Ok(Err(e)) => tracing::warn!(error = %e, key = %key, "Cache read failed"),
                Err(_) => tracing::warn!(key = %key, "Cache read timed out, treating as miss"),
            }
        }

        let (items, source) = self.rank(identity, limit).await?;

        tracing::info!(
            store = self.store.name(),
            source = source.as_str(),
            count = items.len(),
            limit = limit.get(),
            "Recommendations generated"
        );

        if let Some(cache) = &self.cache {
            cache.set_in_background(&key, &items);
        }

        Ok(items)
    }

    /// Personalized ranking if it yields rows, popularity otherwise
    pub async fn rank(
        &self,
        identity: &Identity,
        limit: Limit,
    ) -> AppResult<(Vec<RecommendedProduct>, RecommendationSource)> {
        if !identity.is_anonymous() {
            let items = self
                .bounded("personalized", self.store.personalized(identity, limit))
                .await?;
            if !items.is_empty() {
                return Ok((items, RecommendationSource::Personalized));
            }
            tracing::debug!("No personalized signal, falling back to popularity");
        }

        let items = self.bounded("popular", self.store.popular(limit)).await?;
        Ok((items, RecommendationSource::Popular))
    }

    async fn bounded<F>(&self, stage: &'static str, query: F) -> AppResult<Vec<RecommendedProduct>>
    where
        F: Future<Output = AppResult<Vec<RecommendedProduct>>>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(Ok(items)) => Ok(items),
            Ok(Err(e)) => {
                tracing::error!(error = %e, stage, "Recommendation query failed");
                Err(match e {
                    AppError::StoreUnavailable(_) => e,
                    other => AppError::StoreUnavailable(other.to_string()),
                })
            }
            Err(_) => {
                tracing::error!(
                    stage,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "Recommendation query timed out"
                );
                Err(AppError::StoreUnavailable(format!(
                    "{} query timed out after {:?}",
                    stage, self.query_timeout
                )))
            }
        }
    }
}
