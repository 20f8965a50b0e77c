use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{
    ApiResponse, ErrorCode,
    auth::requests::RegisterRequest,
    users::{entities::UserRole, requests::CreateUserRequest},
};
use crate::services::{ServiceResult, bad_request, error_response, finish, notifications};
use crate::storage::Storage;
use crate::utils::password::hash_password;
use crate::utils::validate::{validate_email, validate_password_simple, validate_username};

use super::AuthService;

pub async fn handle_register(
    service: &AuthService,
    register_request: RegisterRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    finish(register(service, register_request, request).await)
}

async fn register(
    service: &AuthService,
    register_request: RegisterRequest,
    request: &HttpRequest,
) -> ServiceResult {
    let storage = service.get_storage(request)?;
    let config = service.get_config();

    let username = register_request.username.trim().to_string();
    let email = register_request.email.trim().to_lowercase();

    // 1. 校验输入
    validate_username(&username).map_err(|msg| bad_request(ErrorCode::UserNameInvalid, msg))?;
    validate_email(&email).map_err(|msg| bad_request(ErrorCode::UserEmailInvalid, msg))?;
    validate_password_simple(&register_request.password)
        .map_err(|msg| bad_request(ErrorCode::UserPasswordInvalid, msg))?;

    // 2. 检查用户名、邮箱是否已存在
    check_username_exists(&storage, &username).await?;
    check_email_exists(&storage, &email).await?;

    // 3. 哈希密码并创建用户，附带初始积分
    let password_hash = hash_password(&register_request.password).map_err(|e| error_response(&e))?;
    let display_name = register_request
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let user = storage
        .create_user(CreateUserRequest {
            username,
            email,
            password: password_hash,
            role: UserRole::User,
            display_name,
            initial_credits: config.credits.initial_grant,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to register user: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::RegisterFailed,
                "Register failed",
            ))
        })?;

    tracing::info!("User {} registered with id {}", user.username, user.id);
    notifications::notify(request, notifications::welcome(&user));

    Ok(HttpResponse::Created().json(ApiResponse::success(user, "Registration successful")))
}

async fn check_username_exists(storage: &Arc<dyn Storage>, username: &str) -> Result<(), HttpResponse> {
    match storage.get_user_by_username(username).await {
        Ok(Some(_)) => Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::UserNameAlreadyExists,
            "Username already exists",
        ))),
        Ok(None) => Ok(()),
        Err(e) => Err(error_response(&e)),
    }
}

async fn check_email_exists(storage: &Arc<dyn Storage>, email: &str) -> Result<(), HttpResponse> {
    match storage.get_user_by_email(email).await {
        Ok(Some(_)) => Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::UserEmailAlreadyExists,
            "Email already exists",
        ))),
        Ok(None) => Ok(()),
        Err(e) => Err(error_response(&e)),
    }
}
