use std::time::Duration;

use crate::utils::retry::{Retryable, TimeoutElapsed};

/// 外部调用错误
///
/// 保留上游失败的原始类别（限流、不可用、超时等），重试耗尽后原样返回给调用方。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalError {
    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("upstream rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("upstream temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout(Option<Duration>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("integration not configured: {0}")]
    Config(String),
}

impl ExternalError {
    /// 按 HTTP 状态码归类上游错误
    pub fn from_status(status: u16, message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        let message = message.into();
        match status {
            429 => ExternalError::RateLimited { retry_after_secs },
            408 => ExternalError::Timeout(None),
            500 | 502 | 503 | 504 | 529 => ExternalError::Unavailable(format!("HTTP {status}: {message}")),
            _ => ExternalError::Http { status, message },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExternalError::Timeout(_))
    }
}

impl Retryable for ExternalError {
    fn is_retryable(&self) -> bool {
        match self {
            ExternalError::RateLimited { .. }
            | ExternalError::Unavailable(_)
            | ExternalError::Timeout(_)
            | ExternalError::Transport(_) => true,
            ExternalError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            ExternalError::MalformedResponse(_) | ExternalError::Config(_) => false,
        }
    }
}

impl From<TimeoutElapsed> for ExternalError {
    fn from(err: TimeoutElapsed) -> Self {
        ExternalError::Timeout(Some(err.0))
    }
}

impl From<reqwest::Error> for ExternalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExternalError::Timeout(None)
        } else if err.is_decode() {
            ExternalError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ExternalError::from_status(status.as_u16(), err.to_string(), None)
        } else {
            ExternalError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            ExternalError::from_status(429, "slow down", Some(3)),
            ExternalError::RateLimited {
                retry_after_secs: Some(3)
            }
        );
        assert!(matches!(
            ExternalError::from_status(503, "down", None),
            ExternalError::Unavailable(_)
        ));
        assert!(ExternalError::from_status(408, "", None).is_timeout());
        assert!(matches!(
            ExternalError::from_status(401, "bad key", None),
            ExternalError::Http { status: 401, .. }
        ));
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(ExternalError::from_status(429, "", None).is_retryable());
        assert!(ExternalError::from_status(502, "", None).is_retryable());
        assert!(ExternalError::Timeout(None).is_retryable());
        assert!(ExternalError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn test_structural_errors_are_not_retryable() {
        assert!(!ExternalError::from_status(400, "bad", None).is_retryable());
        assert!(!ExternalError::from_status(404, "", None).is_retryable());
        assert!(!ExternalError::MalformedResponse("{".into()).is_retryable());
        assert!(!ExternalError::Config("no key".into()).is_retryable());
    }

    #[test]
    fn test_timeout_elapsed_converts() {
        let err: ExternalError = TimeoutElapsed(Duration::from_secs(2)).into();
        assert_eq!(err, ExternalError::Timeout(Some(Duration::from_secs(2))));
    }
}
