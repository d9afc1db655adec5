use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Browser clients for every role dashboard hit this API directly, so the
/// policy is open on origins but limited to the methods the API serves.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .allow_origin(Any)
}
