use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog row, owned by the catalog-management service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Price in the smallest currency unit
    pub price: i64,
    pub stock: i64,
    pub image_url: Option<String>,
    /// Newer products win popularity ties
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product stamped with the current time
    pub fn new(name: impl Into<String>, price: i64, stock: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            stock,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    /// Pairs the catalog row with a score for the response
    pub fn recommend(&self, score: i64) -> RecommendedProduct {
        RecommendedProduct {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            image_url: self.image_url.clone(),
            score,
        }
    }
}

/// A product as returned to the shopper.
///
/// `score` is a co-occurrence count on the personalized path and a raw
/// interaction count on the popularity path. The two are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RecommendedProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i64,
    pub image_url: Option<String>,
    pub score: i64,
}
