use thiserror::Error;

const BAD_REQUEST: &str = "입력 정보가 올바르지 않습니다.";
const UNAUTHORIZED: &str = "로그인이 필요합니다.";
const NOT_FOUND: &str = "요청한 정보를 찾을 수 없습니다.";
const SERVER: &str = "서버에 일시적인 문제가 발생했습니다. 잠시 후 다시 시도해주세요.";
const NETWORK: &str = "네트워크 오류가 발생했습니다. 인터넷 연결을 확인해주세요.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400, with the server's message when it sent one.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("route plan rejected: {0}")]
    InvalidRoute(#[from] shared::InvalidCoordinate),
}

impl ApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        let body = body.trim().to_string();
        match status {
            400 => ApiError::BadRequest(body),
            401 => ApiError::Unauthorized(body),
            404 => ApiError::NotFound(body),
            s if s >= 500 => ApiError::Server { status, body },
            _ => ApiError::Status { status, body },
        }
    }

    /// Replaces an empty 400/401/404 message with an endpoint-specific one.
    pub(crate) fn or_message(self, status: u16, message: &str) -> Self {
        match self {
            ApiError::BadRequest(body) if status == 400 && body.is_empty() => {
                ApiError::BadRequest(message.to_string())
            }
            ApiError::Unauthorized(body) if status == 401 && body.is_empty() => {
                ApiError::Unauthorized(message.to_string())
            }
            ApiError::NotFound(_) if status == 404 => ApiError::NotFound(message.to_string()),
            other => other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::InvalidRoute(_) => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::BadRequest(body) => non_empty_or(body, BAD_REQUEST),
            ApiError::Unauthorized(body) => non_empty_or(body, UNAUTHORIZED),
            ApiError::NotFound(body) => non_empty_or(body, NOT_FOUND),
            ApiError::Server { .. } => SERVER.to_string(),
            ApiError::Status { status, .. } => format!("요청을 처리하지 못했습니다. ({status})"),
            ApiError::Network(_) => NETWORK.to_string(),
            ApiError::Decode(_) | ApiError::InvalidRoute(_) => SERVER.to_string(),
        }
    }
}

fn non_empty_or(body: &str, fallback: &str) -> String {
    if body.is_empty() {
        fallback.to_string()
    } else {
        body.to_string()
    }
}
