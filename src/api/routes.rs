use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the API router with request ids, tracing and CORS
pub fn create_router(state: AppState, allowed_origins: Option<Vec<String>>) -> Router {
    let layers = ServiceBuilder::new()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(cors_layer(allowed_origins));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/recommendations", get(handlers::recommendations))
        .layer(layers)
        .with_state(state)
}

/// CORS policy: any method and header, origins from config (`None` = any)
fn cors_layer(allowed_origins: Option<Vec<String>>) -> CorsLayer {
    let origin = match allowed_origins {
        None => AllowOrigin::from(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
