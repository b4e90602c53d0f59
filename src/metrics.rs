use actix_web::HttpResponse;
use prometheus::{register_counter, register_histogram, Counter, Histogram};

// Prometheus metrics for the GraphQL endpoint
lazy_static::lazy_static! {
    // Counter for every executed GraphQL request
    pub static ref GRAPHQL_REQUESTS: Counter = register_counter!(
        "linkfeed_graphql_requests_total",
        "Total GraphQL requests executed"
    ).expect("register linkfeed_graphql_requests_total");

    // Counter for responses that carried at least one error
    pub static ref GRAPHQL_ERRORS: Counter = register_counter!(
        "linkfeed_graphql_errors_total",
        "GraphQL responses containing errors"
    ).expect("register linkfeed_graphql_errors_total");

    // Histogram for GraphQL execution time in seconds
    pub static ref GRAPHQL_REQUEST_SECONDS: Histogram = register_histogram!(
        "linkfeed_graphql_request_seconds",
        "GraphQL execution time in seconds"
    ).expect("register linkfeed_graphql_request_seconds");

    // Counter for Authorization headers that failed to decode
    pub static ref AUTH_FAILURES: Counter = register_counter!(
        "linkfeed_auth_failures_total",
        "Authorization headers that could not be decoded"
    ).expect("register linkfeed_auth_failures_total");
}

// Handles GET /metrics requests to expose Prometheus metrics
pub async fn metrics() -> HttpResponse {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let encoded = encoder.encode_to_string(&metric_families).unwrap_or_default();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(encoded)
}
