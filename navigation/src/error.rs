use thiserror::Error;

/// Failure of one pedestrian route request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Rejected locally by the rate limiter, no request was sent.
    #[error("route request throttled locally")]
    Throttled,
    #[error("routing API rate limit reached")]
    RateLimited,
    #[error("routing API returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("routing API unreachable: {0}")]
    Network(String),
    #[error("no route in routing API response")]
    NoRoute,
}

impl RouteError {
    pub fn user_message(&self) -> String {
        match self {
            RouteError::Throttled => "잠시 후 다시 시도해주세요.".to_string(),
            RouteError::RateLimited => {
                "API 호출 한도를 초과했습니다. 1분 후 다시 시도해주세요.".to_string()
            }
            RouteError::Http { status, body } => format!("API 오류: {status} - {body}"),
            RouteError::Network(_) => "네트워크 오류가 발생했습니다.".to_string(),
            RouteError::NoRoute => "경로를 찾을 수 없습니다.".to_string(),
        }
    }
}

/// Raised by a [`crate::pedestrian::RouteTransport`] when no HTTP response
/// could be obtained at all.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

impl From<TransportError> for RouteError {
    fn from(err: TransportError) -> Self {
        RouteError::Network(err.0)
    }
}

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("failed to read GPX file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("GPX document has no track or route points")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            RouteError::RateLimited.user_message(),
            "API 호출 한도를 초과했습니다. 1분 후 다시 시도해주세요."
        );
        assert_eq!(
            RouteError::Http {
                status: 500,
                body: "boom".into()
            }
            .user_message(),
            "API 오류: 500 - boom"
        );
        assert_eq!(
            RouteError::Network("refused".into()).user_message(),
            "네트워크 오류가 발생했습니다."
        );
        assert_eq!(RouteError::NoRoute.user_message(), "경로를 찾을 수 없습니다.");
    }

    #[test]
    fn test_transport_error_maps_to_network() {
        let err: RouteError = TransportError("connection refused".into()).into();
        assert_eq!(err, RouteError::Network("connection refused".into()));
    }
}
