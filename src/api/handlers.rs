use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Identity, Limit, RecommendationsResponse},
};

use super::AppState;

/// Raw query string for `GET /recommendations`.
///
/// `limit` is kept as a string so malformed values surface as our own 400
/// body instead of axum's extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationParams {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub limit: Option<String>,
}

impl RecommendationParams {
    pub fn limit(&self) -> AppResult<Limit> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(Limit::default()),
            Some(raw) => {
                let value = raw.parse::<i64>().map_err(|_| {
                    AppError::InvalidParameter(format!("limit must be an integer, got {:?}", raw))
                })?;
                Limit::new(value)
            }
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id.clone(), self.session_id.clone())
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Ranked products the shopper has not interacted with yet
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationsResponse>> {
    let limit = params.limit()?;
    let identity = params.identity();

    tracing::info!(
        request_id = %request_id,
        has_user = identity.user_id().is_some(),
        has_session = identity.session_id().is_some(),
        limit = limit.get(),
        "Processing recommendations request"
    );

    let items = state.engine.get_recommendations(&identity, limit).await?;

    Ok(Json(RecommendationsResponse::from(items)))
}
