use serde::{Deserialize, Serialize};

pub mod event;
pub mod identity;
pub mod product;

pub use event::{Event, EventType};
pub use identity::{Identity, Limit};
pub use product::{Product, RecommendedProduct};

/// Response body for `GET /recommendations`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationsResponse {
    pub items: Vec<RecommendedProduct>,
}

impl From<Vec<RecommendedProduct>> for RecommendationsResponse {
    fn from(items: Vec<RecommendedProduct>) -> Self {
        Self { items }
    }
}
