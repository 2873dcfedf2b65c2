use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Event, EventType, Identity, Limit, Product, RecommendedProduct},
    services::stores::{RecommendationStore, MAX_SEED_PRODUCTS},
};

/// In-process event log and catalog.
///
/// Evaluates the same stages as the SQL store: seed set, session and user
/// cohorts, co-occurrence scoring, then an inner join against the catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    products: Vec<Product>,
    events: Vec<Event>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&mut self, product: Product) -> Uuid {
        let id = product.id;
        self.products.push(product);
        id
    }

    /// Appends an event, assigning the next sequence id
    pub fn record(
        &mut self,
        event_type: EventType,
        product_id: Option<Uuid>,
        user_id: Option<&str>,
        session_id: Option<&str>,
    ) {
        let id = self.events.len() as i64 + 1;
        self.events.push(Event {
            id,
            event_type,
            product_id,
            user_id: user_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
        });
    }

    /// Products the identity engaged with, ascending, capped at `MAX_SEED_PRODUCTS`
    pub fn seed_set(&self, identity: &Identity) -> BTreeSet<Uuid> {
        let matches_identity = |event: &Event| {
            let by_user = identity
                .user_id()
                .is_some_and(|u| event.user_id.as_deref() == Some(u));
            let by_session = identity
                .session_id()
                .is_some_and(|s| event.session_id.as_deref() == Some(s));
            by_user || by_session
        };

        self.events
            .iter()
            .filter(|e| e.event_type.is_seed_signal() && matches_identity(e))
            .filter_map(|e| e.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(MAX_SEED_PRODUCTS)
            .collect()
    }

    fn cohorts(&self, seeds: &BTreeSet<Uuid>) -> (HashSet<&str>, HashSet<&str>) {
        let mut sessions = HashSet::new();
        let mut users = HashSet::new();

        for event in &self.events {
            let Some(product_id) = event.product_id else {
                continue;
            };
            if !seeds.contains(&product_id) {
                continue;
            }
            if let Some(session) = event.session_id.as_deref() {
                sessions.insert(session);
            }
            if let Some(user) = event.user_id.as_deref() {
                users.insert(user);
            }
        }

        (sessions, users)
    }

    /// Non-seed products ranked by cohort co-occurrence, ties by id
    fn scored_candidates(&self, seeds: &BTreeSet<Uuid>, limit: Limit) -> Vec<(Uuid, i64)> {
        let (sessions, users) = self.cohorts(seeds);
        let mut scores: HashMap<Uuid, i64> = HashMap::new();

        for event in &self.events {
            let Some(product_id) = event.product_id else {
                continue;
            };
            if seeds.contains(&product_id) {
                continue;
            }
            let in_session_cohort = event
                .session_id
                .as_deref()
                .is_some_and(|s| sessions.contains(s));
            let in_user_cohort = event
                .user_id
                .as_deref()
                .is_some_and(|u| users.contains(u));
            if in_session_cohort || in_user_cohort {
                *scores.entry(product_id).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(Uuid, i64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit.get());
        ranked
    }
}

#[async_trait::async_trait]
impl RecommendationStore for InMemoryStore {
    async fn personalized(
        &self,
        identity: &Identity,
        limit: Limit,
    ) -> AppResult<Vec<RecommendedProduct>> {
        let seeds = self.seed_set(identity);
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let catalog: HashMap<Uuid, &Product> = self.products.iter().map(|p| (p.id, p)).collect();

        Ok(self
            .scored_candidates(&seeds, limit)
            .into_iter()
            .filter_map(|(id, score)| catalog.get(&id).map(|p| p.recommend(score)))
            .collect())
    }

    async fn popular(&self, limit: Limit) -> AppResult<Vec<RecommendedProduct>> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for event in self
            .events
            .iter()
            .filter(|e| e.event_type.is_popularity_signal())
        {
            if let Some(product_id) = event.product_id {
                *counts.entry(product_id).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&Product, i64)> = self
            .products
            .iter()
            .map(|p| (p, counts.get(&p.id).copied().unwrap_or(0)))
            .collect();
        ranked.sort_by(|(pa, sa), (pb, sb)| {
            sb.cmp(sa)
                .then(pb.created_at.cmp(&pa.created_at))
                .then(pa.id.cmp(&pb.id))
        });

        Ok(ranked
            .into_iter()
            .take(limit.get())
            .map(|(p, score)| p.recommend(score))
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
