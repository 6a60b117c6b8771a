//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every API endpoint to its handler and
//! returns a ready-to-serve [`axum::Router`].

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, options, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::generate_request_id;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the Bookdex API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookdex API",
        version = "0.1.0",
        description = "Book-cataloging API with cover-image object storage"
    ),
    paths(
        health_check,
        // Author operations
        crate::handlers::authors::list_authors,
        crate::handlers::authors::create_author,
        crate::handlers::authors::get_author,
        crate::handlers::authors::update_author,
        crate::handlers::authors::delete_author,
        // Book operations
        crate::handlers::books::list_books,
        crate::handlers::books::create_book,
        crate::handlers::books::get_book,
        crate::handlers::books::update_book,
        crate::handlers::books::delete_book,
        crate::handlers::books::cover_upload_url,
        // Cover blob serving
        crate::handlers::covers::get_cover,
        crate::handlers::covers::put_cover,
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Authors", description = "Author catalog operations"),
        (name = "Books", description = "Book catalog operations"),
        (name = "Covers", description = "Signed cover blob serving"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all API routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Infrastructure endpoints.
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_spec))
        // Author routes.
        .route("/authors", get(crate::handlers::authors::list_authors))
        .route("/authors", post(crate::handlers::authors::create_author))
        .route("/authors", options(preflight))
        .route("/authors/:author_id", get(crate::handlers::authors::get_author))
        .route("/authors/:author_id", put(crate::handlers::authors::update_author))
        .route("/authors/:author_id", delete(crate::handlers::authors::delete_author))
        .route("/authors/:author_id", options(preflight))
        // Book routes.
        .route("/books", get(crate::handlers::books::list_books))
        .route("/books", post(crate::handlers::books::create_book))
        .route("/books", options(preflight))
        .route("/books/:book_id", get(crate::handlers::books::get_book))
        .route("/books/:book_id", put(crate::handlers::books::update_book))
        .route("/books/:book_id", delete(crate::handlers::books::delete_book))
        .route("/books/:book_id", options(preflight))
        .route(
            "/books/:book_id/cover-upload-url",
            get(crate::handlers::books::cover_upload_url),
        )
        .route("/books/:book_id/cover-upload-url", options(preflight))
        // Signed cover blob serving (wildcard key captures slashes).
        .route("/covers/*key", get(crate::handlers::covers::get_cover))
        .route("/covers/*key", put(crate::handlers::covers::put_cover))
        // Application state shared across all handlers.
        .with_state(state.clone())
        // Layer ordering: inner layers run first, outer layers wrap them.
        .layer(middleware::from_fn_with_state(state, cors_middleware))
        .layer(middleware::from_fn(common_headers_middleware))
        // metrics_middleware is outer (captures full request lifecycle).
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

// -- CORS middleware ----------------------------------------------------------

/// Adds CORS headers to every response: the request origin is echoed
/// back when allow-listed, otherwise the configured default origin is
/// used. Methods and headers are fixed.
async fn cors_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_origin = req
        .headers()
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let cors = &state.config.cors;
    let origin = match request_origin {
        Some(origin) if cors.allowed_origins.iter().any(|a| *a == origin) => origin,
        _ => cors.default_origin.clone(),
    };

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&origin) {
        headers.insert("access-control-allow-origin", value);
    }
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("OPTIONS,GET,POST,PUT,DELETE"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(
            "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token",
        ),
    );
    response
}

/// `OPTIONS` preflight handler: 200 with an empty body. The CORS
/// middleware attaches the actual headers.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

// -- Common headers middleware -----------------------------------------------

/// Adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Date`: RFC 7231 formatted timestamp
/// - `Server`: `Bookdex`
async fn common_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Error responses set their own request id; keep it.
    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-request-id", value);
        }
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static("Bookdex"));

    response
}

// -- Infrastructure handlers --------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Health check OK")
    )
)]
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

/// `GET /openapi.json` -- the generated OpenAPI document.
async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ── Tests ───────────────────────────────────────────────────────────
