//! Read-side access to the event log and product catalog
//!
//! The engine only ever talks to a `RecommendationStore`. The Postgres store
//! runs each stage as one SQL statement; the in-memory store evaluates the
//! same stages over plain vectors and backs tests and local development.

use crate::{
    error::AppResult,
    models::{Identity, Limit, RecommendedProduct},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Upper bound on seed products considered per request
pub const MAX_SEED_PRODUCTS: usize = 20;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Co-occurrence recommendations for the given identity.
    ///
    /// Seeds are the identity's engaged products; candidates are everything
    /// else touched by sessions or users that share a seed. Returns at most
    /// `limit` rows joined against the catalog, score descending, never
    /// including a seed product.
    async fn personalized(
        &self,
        identity: &Identity,
        limit: Limit,
    ) -> AppResult<Vec<RecommendedProduct>>;

    /// Catalog products ranked by view and add-to-cart counts.
    ///
    /// Products without events score zero. Ties go to the newest product.
    async fn popular(&self, limit: Limit) -> AppResult<Vec<RecommendedProduct>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
