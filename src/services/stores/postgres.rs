use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{EventType, Identity, Limit, RecommendedProduct},
    services::stores::{RecommendationStore, MAX_SEED_PRODUCTS},
};

/// Seed, cohort expansion, scoring and catalog join in one statement.
///
/// $1 user id, $2 session id ('' means absent), $3 limit,
/// $4 seed event types, $5 seed cap.
const PERSONALIZED_SQL: &str = r#"
WITH base AS (
  SELECT DISTINCT product_id
  FROM events
  WHERE product_id IS NOT NULL
    AND event_type::text = ANY($4)
    AND (
      ($1 <> '' AND user_id::text = $1)
      OR ($2 <> '' AND session_id::text = $2)
    )
  ORDER BY product_id
  LIMIT $5
),
sessions AS (
  SELECT DISTINCT session_id
  FROM events
  WHERE product_id IN (SELECT product_id FROM base)
    AND session_id IS NOT NULL
),
users AS (
  SELECT DISTINCT user_id
  FROM events
  WHERE product_id IN (SELECT product_id FROM base)
    AND user_id IS NOT NULL
),
scored AS (
  SELECT e.product_id, COUNT(*) AS score
  FROM events e
  WHERE e.product_id IS NOT NULL
    AND e.product_id NOT IN (SELECT product_id FROM base)
    AND (
      e.session_id IN (SELECT session_id FROM sessions)
      OR e.user_id IN (SELECT user_id FROM users)
    )
  GROUP BY e.product_id
  ORDER BY score DESC, e.product_id
  LIMIT $3
)
SELECT p.id, p.name, p.description,
       p.price::bigint AS price, p.stock::bigint AS stock,
       p.image_url, s.score
FROM products p
JOIN scored s ON s.product_id = p.id
ORDER BY s.score DESC, p.id
"#;

/// Catalog ranked by interaction count; $1 limit, $2 counted event types.
const POPULAR_SQL: &str = r#"
SELECT p.id, p.name, p.description,
       p.price::bigint AS price, p.stock::bigint AS stock,
       p.image_url, COUNT(e.id) AS score
FROM products p
LEFT JOIN events e
  ON e.product_id = p.id
 AND e.event_type::text = ANY($2)
GROUP BY p.id
ORDER BY score DESC, p.created_at DESC, p.id
LIMIT $1
"#;

/// Store backed by the shared `events` and `products` tables.
///
/// Each query checks a connection out of the pool for its own duration; the
/// connection goes back on every exit path, including when the caller drops
/// the future mid-query.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationStore for PostgresStore {
    #[tracing::instrument(skip(self, identity), fields(store = "postgres"))]
    async fn personalized(
        &self,
        identity: &Identity,
        limit: Limit,
    ) -> AppResult<Vec<RecommendedProduct>> {
        let rows = sqlx::query_as::<_, RecommendedProduct>(PERSONALIZED_SQL)
            .bind(identity.user_id().unwrap_or(""))
            .bind(identity.session_id().unwrap_or(""))
            .bind(limit.as_i64())
            .bind(EventType::seed_signal_names())
            .bind(MAX_SEED_PRODUCTS as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(store = "postgres"))]
    async fn popular(&self, limit: Limit) -> AppResult<Vec<RecommendedProduct>> {
        let rows = sqlx::query_as::<_, RecommendedProduct>(POPULAR_SQL)
            .bind(limit.as_i64())
            .bind(EventType::popularity_signal_names())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
