use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::models::auth::responses::{RefreshTokenResponse, UserInfoResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{ServiceResult, current_user, error_response, finish};
use crate::utils::jwt::JwtUtils;

use super::AuthService;

fn login_expired() -> HttpResponse {
    HttpResponse::Unauthorized()
        .cookie(JwtUtils::create_empty_refresh_token_cookie())
        .json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Login expired or invalid, please login again",
        ))
}

/// 用 cookie 中的 refresh token 换取新的 access token
///
/// 角色以数据库为准，停用的账号无法续期。
pub async fn handle_refresh_token(
    service: &AuthService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    finish(refresh(service, request).await)
}

async fn refresh(service: &AuthService, request: &HttpRequest) -> ServiceResult {
    let config = service.get_config();

    let refresh_token = JwtUtils::extract_refresh_token_from_cookie(request).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized access, please login",
        ))
    })?;

    let claims = JwtUtils::verify_refresh_token(&refresh_token).map_err(|e| {
        tracing::info!("Refresh token rejected: {}", e);
        login_expired()
    })?;
    let user_id = claims.user_id().ok_or_else(login_expired)?;

    let storage = service.get_storage(request)?;
    let user = storage
        .get_user_by_id(user_id)
        .await
        .map_err(|e| error_response(&e))?
        .filter(|user| user.is_active())
        .ok_or_else(login_expired)?;

    let access_token = JwtUtils::generate_access_token(user.id, user.role.as_str()).map_err(|e| {
        tracing::error!("Failed to generate access token: {}", e);
        HttpResponse::InternalServerError().json(ApiResponse::error_empty(
            ErrorCode::InternalServerError,
            "Unable to refresh token",
        ))
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        RefreshTokenResponse {
            access_token,
            expires_in: config.jwt.access_token_expiry * 60,
        },
        "Token refreshed successfully",
    )))
}

pub async fn handle_get_user(
    _service: &AuthService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    finish(current_user(request).map(|user| {
        HttpResponse::Ok().json(ApiResponse::success(
            UserInfoResponse { user },
            "User information retrieved successfully",
        ))
    }))
}
