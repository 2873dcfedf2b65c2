use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Identity hints for the requesting shopper.
///
/// Blank values are dropped at construction, so an `Identity` never holds an
/// empty or whitespace-only string that could match blank data in the event
/// log. Non-blank values are kept exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    user_id: Option<String>,
    session_id: Option<String>,
}

impl Identity {
    pub fn new(user_id: Option<String>, session_id: Option<String>) -> Self {
        Self {
            user_id: normalize(user_id),
            session_id: normalize(session_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// True when neither a user nor a session was supplied
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none() && self.session_id.is_none()
    }
}

/// Drops blank values; anything else is matched exactly as sent
fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Result-count limit, always within `[Limit::MIN, Limit::MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Limit(u8);

impl Limit {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 20;
    pub const DEFAULT: i64 = 6;

    pub fn new(value: i64) -> AppResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(AppError::InvalidParameter(format!(
                "limit must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(Self::DEFAULT as u8)
    }
}
