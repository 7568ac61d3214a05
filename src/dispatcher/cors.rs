//! CORS preflight answers for `OPTIONS` requests without a route.

use http::Method;
use tracing::info;

use crate::config::CorsConfig;
use crate::router::{RouteTable, ROUTABLE_METHODS};
use crate::server::Response;

/// Verbs a client may use on `path`: every method with a matching route,
/// plus `OPTIONS`, in [`ROUTABLE_METHODS`] order.
#[must_use]
pub fn allowed_methods(table: &RouteTable, path: &str) -> Vec<Method> {
    let routed = table.allowed_methods(path);
    ROUTABLE_METHODS
        .iter()
        .filter(|m| **m == Method::OPTIONS || routed.contains(m))
        .cloned()
        .collect()
}

/// Value of `Access-Control-Allow-Origin`, `None` when no origin is
/// configured
#[must_use]
pub fn allow_origin(cors: &CorsConfig) -> Option<String> {
    if cors.allowed_origins.is_empty() {
        None
    } else {
        Some(cors.allowed_origins.join(", "))
    }
}

/// Answer a preflight request for `path`. Always 200, even when nothing is
/// routed there.
pub fn preflight(table: &RouteTable, cors: &CorsConfig, path: &str, response: &mut Response) {
    let methods = allowed_methods(table, path)
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(",");

    response.set_status(200);
    response.set_header("Allow", methods.as_str());
    response.set_header("Access-Control-Allow-Methods", methods.as_str());
    response.set_header("Access-Control-Max-Age", cors.max_age.to_string());
    if !cors.allowed_headers.is_empty() {
        response.set_header("Access-Control-Allow-Headers", cors.allowed_headers.join(","));
    }
    response.body.clear();

    info!(path = %path, allowed_methods = %methods, "CORS preflight answered");
}
