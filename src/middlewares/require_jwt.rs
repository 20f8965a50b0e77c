/*!
 * JWT 认证中间件
 *
 * 校验 `Authorization: Bearer <token>` 中的 access token，加载对应用户并写入
 * 请求扩展，处理程序通过 [`RequireJWT::extract_user_claims`] 读取。
 *
 * ```rust,ignore
 * web::scope("/api/v1/courses")
 *     .wrap(RequireJWT)
 *     .route("", web::get().to(list_courses))
 * ```
 *
 * 用户对象按用户 ID 缓存 `cache.default_ttl` 秒；积分、状态变化后调用
 * [`RequireJWT::invalidate_user`] 使缓存失效。
 */

use crate::cache::{ObjectCache, get_json, insert_json};
use crate::config::AppConfig;
use crate::models::ErrorCode;
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, info, warn};

use super::create_error_response;

const BEARER_PREFIX: &str = "Bearer ";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct RequireJWT;

struct AuthRejection {
    status: StatusCode,
    code: ErrorCode,
    message: &'static str,
}

impl AuthRejection {
    fn unauthorized(message: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: ErrorCode::Unauthorized,
            message,
        }
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// 校验 access token 并加载用户，优先读缓存
async fn authenticate(req: &ServiceRequest) -> Result<User, AuthRejection> {
    let token = bearer_token(req)
        .ok_or_else(|| AuthRejection::unauthorized("Missing or invalid Authorization header"))?;

    let claims = JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        AuthRejection::unauthorized("Invalid JWT token")
    })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| AuthRejection::unauthorized("Invalid user ID in JWT"))?;

    let cache = req
        .app_data::<web::Data<Arc<dyn ObjectCache>>>()
        .map(|c| c.get_ref().clone());
    let cache_key = RequireJWT::cache_key(user_id);

    let cached = match cache.as_deref() {
        Some(cache) => get_json::<User>(cache, &cache_key).await,
        None => None,
    };

    let user = match cached {
        Some(user) => user,
        None => {
            let storage = req
                .app_data::<web::Data<Arc<dyn Storage>>>()
                .map(|s| s.get_ref().clone())
                .ok_or_else(|| {
                    warn!("Storage is not registered in app data");
                    AuthRejection {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        code: ErrorCode::InternalServerError,
                        message: "Authentication backend unavailable",
                    }
                })?;

            let user = storage
                .get_user_by_id(user_id)
                .await
                .map_err(|err| {
                    warn!("Failed to load user {} for JWT: {}", user_id, err);
                    AuthRejection {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        code: ErrorCode::InternalServerError,
                        message: "Failed to retrieve user",
                    }
                })?
                .ok_or_else(|| AuthRejection::unauthorized("User not found"))?;

            if let Some(cache) = cache.as_deref() {
                insert_json(
                    cache,
                    &cache_key,
                    &user,
                    AppConfig::get().cache.default_ttl,
                )
                .await;
            }
            user
        }
    };

    if !user.is_active() {
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            code: ErrorCode::UserInactive,
            message: "User is not active",
        });
    }

    Ok(user)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 处理 OPTIONS 请求
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match authenticate(&req).await {
                Ok(user) => {
                    debug!("JWT authentication successful for ID: {}", user.id);
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(rejection) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        rejection.message
                    );
                    Ok(req.into_response(
                        create_error_response(rejection.status, rejection.code, rejection.message)
                            .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

impl RequireJWT {
    pub fn cache_key(user_id: i64) -> String {
        format!("user:{user_id}")
    }

    /// 用户信息变化后移除缓存
    pub async fn invalidate_user(cache: &dyn ObjectCache, user_id: i64) {
        cache.remove(&Self::cache_key(user_id)).await;
    }

    /// 从请求扩展中提取当前用户
    /// 此函数应该在应用了RequireJWT中间件的路由处理程序中使用
    pub fn extract_user_claims(req: &actix_web::HttpRequest) -> Option<User> {
        req.extensions().get::<User>().cloned()
    }

    pub fn extract_user_id(req: &actix_web::HttpRequest) -> Option<i64> {
        req.extensions().get::<User>().map(|user| user.id)
    }

    pub fn extract_user_role(req: &actix_web::HttpRequest) -> Option<UserRole> {
        req.extensions().get::<User>().map(|user| user.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION_HEADER, "Bearer abc.def"))
            .to_srv_request();
        assert_eq!(bearer_token(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION_HEADER, "Basic abc"))
            .to_srv_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION_HEADER, "Bearer   "))
            .to_srv_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_cache_key_is_per_user() {
        assert_eq!(RequireJWT::cache_key(12), "user:12");
    }
}
