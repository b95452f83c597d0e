pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE},
        HeaderMap, HeaderName, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::ProxyError;

const JSESSIONID: HeaderName = HeaderName::from_static("jsessionid");
const X_SESSION_ID: HeaderName = HeaderName::from_static("x-session-id");
const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub backend_base_url: Arc<str>,
}

impl AppState {
    pub fn new(backend_base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            backend_base_url: Arc::from(backend_base_url.trim_end_matches('/')),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/proxy", any(proxy_handler))
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, with credentials, and the session headers the web client
/// sends.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            X_REQUESTED_WITH,
            JSESSIONID,
            X_SESSION_ID,
        ])
        .allow_credentials(true)
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    path: Option<String>,
}

async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }

    let path = params
        .path
        .filter(|p| !p.is_empty())
        .ok_or(ProxyError::MissingPath)?;
    let target = format!("{}{path}", state.backend_base_url);
    tracing::info!("{method} {target}");

    let mut upstream = state
        .http
        .request(method.clone(), &target)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json");
    for name in [AUTHORIZATION, JSESSIONID, X_SESSION_ID] {
        if let Some(value) = headers.get(&name) {
            upstream = upstream.header(name, value.clone());
        }
    }
    if matches!(method, Method::POST | Method::PUT | Method::PATCH) && !body.is_empty() {
        upstream = upstream.body(body);
    }

    let response = upstream.send().await?;
    let status = response.status();
    let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().cloned().collect();
    let text = response.text().await?;
    tracing::info!("{target} answered {status}");

    let mut reply = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => (status, Json(json)).into_response(),
        Err(_) => (status, text).into_response(),
    };
    for cookie in cookies {
        reply.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(reply)
}
