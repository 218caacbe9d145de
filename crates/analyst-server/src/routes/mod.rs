//! HTTP routes

mod analyze;
mod health;

pub use analyze::analyze_routes;
pub use health::health_routes;

use crate::AppState;
use axum::Router;
use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

/// Full application router
///
/// Any origin may call the API; the browser front end is served separately.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(analyze_routes(state))
        .merge(health_routes())
        .layer(cors)
}
