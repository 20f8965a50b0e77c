pub mod admin;
pub mod announcements;
pub mod auth;
pub mod badges;
pub mod courses;
pub mod credits;
pub mod generation;
pub mod materials;
pub mod notifications;
pub mod progress;
pub mod submissions;
pub mod system;
pub mod tickets;

pub use admin::AdminService;
pub use announcements::AnnouncementService;
pub use auth::AuthService;
pub use badges::BadgeService;
pub use courses::CourseService;
pub use credits::CreditService;
pub use materials::MaterialService;
pub use progress::ProgressService;
pub use submissions::SubmissionService;
pub use system::SystemService;
pub use tickets::TicketService;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use crate::errors::LearnHubError;
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode, users::entities::User};

/// 服务内部的处理结果，`Err` 分支是已经构造好的错误响应
pub(crate) type ServiceResult = Result<HttpResponse, HttpResponse>;

pub(crate) fn finish(result: ServiceResult) -> ActixResult<HttpResponse> {
    Ok(result.unwrap_or_else(|response| response))
}

/// 从 app_data 中取出共享依赖（存储、缓存、大模型、邮件）
pub(crate) fn app_data<T: ?Sized + 'static>(request: &HttpRequest) -> Result<Arc<T>, HttpResponse> {
    request
        .app_data::<web::Data<Arc<T>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| {
            tracing::error!(
                "{} is not registered in app data",
                std::any::type_name::<T>()
            );
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Service dependency unavailable",
            ))
        })
}

/// 可选依赖（缓存、邮件），未注册时返回 None
pub(crate) fn optional_app_data<T: ?Sized + 'static>(request: &HttpRequest) -> Option<Arc<T>> {
    request
        .app_data::<web::Data<Arc<T>>>()
        .map(|data| data.get_ref().clone())
}

pub(crate) fn current_user(request: &HttpRequest) -> Result<User, HttpResponse> {
    RequireJWT::extract_user_claims(request).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized access, please login",
        ))
    })
}

/// 按内部错误类型选择 HTTP 状态；未预期的错误只返回通用信息
pub(crate) fn error_response(err: &LearnHubError) -> HttpResponse {
    let message = err.message().to_string();
    match err {
        LearnHubError::Validation(_) => HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::ValidationFailed, message)),
        LearnHubError::NotFound(_) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(ErrorCode::NotFound, message))
        }
        LearnHubError::InsufficientCredits(_) => HttpResponse::PaymentRequired()
            .json(ApiResponse::error_empty(ErrorCode::InsufficientCredits, message)),
        LearnHubError::Authentication(_) => HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, message)),
        LearnHubError::Authorization(_) => {
            HttpResponse::Forbidden().json(ApiResponse::error_empty(ErrorCode::Forbidden, message))
        }
        LearnHubError::ExternalService(_) => {
            tracing::warn!("Upstream service failed: {}", err);
            HttpResponse::BadGateway().json(ApiResponse::error_empty(
                ErrorCode::AiServiceUnavailable,
                "Upstream service is unavailable, please try again later",
            ))
        }
        _ => {
            tracing::error!("Request failed: {}", err);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Internal server error",
            ))
        }
    }
}

pub(crate) fn bad_request(code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(code, message))
}

pub(crate) fn not_found(code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(code, message))
}

pub(crate) fn forbidden(code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::Forbidden().json(ApiResponse::error_empty(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (LearnHubError::validation("bad"), StatusCode::BAD_REQUEST),
            (LearnHubError::not_found("gone"), StatusCode::NOT_FOUND),
            (
                LearnHubError::insufficient_credits("poor"),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LearnHubError::authorization("no"), StatusCode::FORBIDDEN),
            (LearnHubError::external_service("503"), StatusCode::BAD_GATEWAY),
            (
                LearnHubError::database_operation("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status, "{err}");
        }
    }

    #[test]
    fn test_missing_app_data_is_internal_error() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = app_data::<dyn crate::storage::Storage>(&req).err().unwrap();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
