use axum::{http::Method, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Raw history
        .route("/history", get(handlers::get_history))
        .route("/history/:content_type", get(handlers::get_history_by_type))
        // Catalogue
        .route("/catalogue", get(handlers::get_catalogue))
        .route("/catalogue/filters", get(handlers::get_catalogue_filters))
        // Content
        .route("/content/:title", get(handlers::get_content_details))
        .route("/content/:title/profiles", get(handlers::get_content_profiles))
        // Profiles
        .route("/profiles", get(handlers::get_profiles))
        .route("/profiles/:name", get(handlers::get_profile))
        .route("/profiles/:name/activity", get(handlers::get_profile_activity))
        .route(
            "/profiles/:name/top-content",
            get(handlers::get_profile_top_content),
        )
        // Outermost first: the request id must exist before the trace span opens
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET]),
                ),
        )
        .with_state(state)
}
