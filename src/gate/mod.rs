//! HTTP surface of the login flow.

pub mod cookies;
pub mod handlers;
pub mod openapi;
pub mod pages;
mod state;

pub use state::GateState;

use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

use crate::handshake::CALLBACK_PATH;

pub const LOGIN_PATH: &str = "/internal/security/login";
pub const IMPLICIT_PAGE_PATH: &str = "/api/security/oidc/implicit";
pub const IMPLICIT_SCRIPT_PATH: &str = "/internal/security/oidc/implicit.js";
pub const ME_PATH: &str = "/internal/security/me";
pub const LOGOUT_PATH: &str = "/api/security/logout";

/// Build the application router.
///
/// Flow endpoints are mounted under the configured base path and carry the
/// security headers; `/health` and the API docs stay at the root.
pub fn router(state: Arc<GateState>) -> Router {
    let mut flow = Router::new()
        .route(LOGIN_PATH, post(handlers::login))
        .route(IMPLICIT_PAGE_PATH, get(handlers::implicit_page))
        .route(IMPLICIT_SCRIPT_PATH, get(handlers::implicit_script))
        .route(CALLBACK_PATH, get(handlers::callback))
        .route(ME_PATH, get(handlers::me))
        .route(LOGOUT_PATH, post(handlers::logout));
    for (name, value) in pages::security_headers() {
        flow = flow.layer(SetResponseHeaderLayer::overriding(name, value));
    }
    flow = flow.layer(SetResponseHeaderLayer::if_not_present(
        CONTENT_TYPE,
        HeaderValue::from_static(pages::FALLBACK_CONTENT_TYPE),
    ));

    let base_path = state.config().base_path();
    let flow = if base_path.is_empty() {
        flow
    } else {
        Router::new().nest(base_path, flow)
    };

    Router::new()
        .route("/health", get(handlers::health).options(handlers::health))
        .merge(flow)
        .merge(openapi::swagger())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Serve the router until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn new(port: u16, state: Arc<GateState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

// span; headers and query are left out, they carry cookies and tokens
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}
