pub mod recommendations;
pub mod stores;

pub use recommendations::{RecommendationEngine, RecommendationSource};
pub use stores::{InMemoryStore, PostgresStore, RecommendationStore};
