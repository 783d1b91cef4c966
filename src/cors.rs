use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN, VARY,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

const ALLOW_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Origin to echo back. An empty allow-list allows any origin; otherwise a
/// listed origin is echoed and anything else gets the first listed one.
pub fn allowed_origin<'a>(allow_list: &'a [String], origin: Option<&'a str>) -> &'a str {
    let Some(first) = allow_list.first() else {
        return "*";
    };
    origin
        .filter(|o| allow_list.iter().any(|allowed| allowed.as_str() == *o))
        .unwrap_or(first.as_str())
}

fn add_cors_headers(response: &mut Response, origin: &str) {
    let headers = response.headers_mut();

    match HeaderValue::from_str(origin) {
        Ok(value) => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(_) => tracing::warn!("Allowed origin {origin:?} is not a valid header value"),
    }
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}

// Preflight short-circuits here, before rate limiting; every other response
// gets the same headers on the way out.
pub async fn cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
    let allow = allowed_origin(&state.config.allowed_origins, origin).to_string();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    add_cors_headers(&mut response, &allow);
    response
}
