use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Path parameter is required")]
    MissingPath,
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ProxyError::MissingPath => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: self.to_string(),
                    message: None,
                },
            ),
            ProxyError::Upstream(err) => {
                tracing::error!("upstream request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Proxy server error".into(),
                        message: Some(err.to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
