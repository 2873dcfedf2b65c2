use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Kinds of shopper interaction recorded in the event log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ViewProduct,
    AddToCart,
    RemoveCart,
    Checkout,
    PromoClick,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::ViewProduct,
        EventType::AddToCart,
        EventType::RemoveCart,
        EventType::Checkout,
        EventType::PromoClick,
    ];

    /// Stored names of every seed-signal event type
    pub fn seed_signal_names() -> Vec<&'static str> {
        Self::names_where(Self::is_seed_signal)
    }

    /// Stored names of every popularity-signal event type
    pub fn popularity_signal_names() -> Vec<&'static str> {
        Self::names_where(Self::is_popularity_signal)
    }

    fn names_where(signal: fn(EventType) -> bool) -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(|t| signal(*t))
            .map(EventType::as_str)
            .collect()
    }

    /// Whether this event marks a product as already engaged with by its shopper
    pub fn is_seed_signal(self) -> bool {
        matches!(
            self,
            EventType::ViewProduct | EventType::AddToCart | EventType::Checkout
        )
    }

    /// Whether this event counts towards global popularity
    pub fn is_popularity_signal(self) -> bool {
        matches!(self, EventType::ViewProduct | EventType::AddToCart)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ViewProduct => "view_product",
            EventType::AddToCart => "add_to_cart",
            EventType::RemoveCart => "remove_cart",
            EventType::Checkout => "checkout",
            EventType::PromoClick => "promo_click",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only interaction fact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: i64,
    pub event_type: EventType,
    pub product_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}
