use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::users::{entities::UserRole, requests::UserListQuery};
use crate::services::AdminService;

static ADMIN_SERVICE: Lazy<AdminService> = Lazy::new(AdminService::new_lazy);

pub async fn get_stats(req: HttpRequest) -> ActixResult<HttpResponse> {
    ADMIN_SERVICE.get_stats(&req).await
}

pub async fn export_users(
    req: HttpRequest,
    query: web::Query<UserListQuery>,
) -> ActixResult<HttpResponse> {
    ADMIN_SERVICE.export_users(&req, query.into_inner()).await
}

pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/admin")
            .wrap(middlewares::RequireRole::any(UserRole::admin_roles()))
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .route("/stats", web::get().to(get_stats))
            .route("/users/export", web::get().to(export_users)),
    );
}
