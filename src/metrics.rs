use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("aitool_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("aitool_rate_limited_total", "Requests denied by the rate limiter").unwrap();
    pub static ref BACKEND_ERRORS_TOTAL: Counter =
        register_counter!("aitool_backend_errors_total", "Backend queries that failed").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "aitool_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_WINDOWS: Gauge =
        register_gauge!("aitool_rate_limit_windows", "Client windows currently tracked").unwrap();
}

// counts every request and records its latency
pub async fn track(req: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let response = next.run(req).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}
