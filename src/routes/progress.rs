use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::progress::requests::UpdateProgressRequest;
use crate::services::{BadgeService, ProgressService};
use crate::utils::SafeCourseIdI64;

static PROGRESS_SERVICE: Lazy<ProgressService> = Lazy::new(ProgressService::new_lazy);
static BADGE_SERVICE: Lazy<BadgeService> = Lazy::new(BadgeService::new_lazy);

pub async fn get_progress(req: HttpRequest, course_id: SafeCourseIdI64) -> ActixResult<HttpResponse> {
    PROGRESS_SERVICE.get_progress(&req, course_id.0).await
}

pub async fn update_progress(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    body: web::Json<UpdateProgressRequest>,
) -> ActixResult<HttpResponse> {
    PROGRESS_SERVICE
        .update_progress(&req, course_id.0, body.into_inner())
        .await
}

pub async fn list_my_progress(req: HttpRequest) -> ActixResult<HttpResponse> {
    PROGRESS_SERVICE.list_my_progress(&req).await
}

pub async fn list_badges(req: HttpRequest) -> ActixResult<HttpResponse> {
    BADGE_SERVICE.list_badges(&req).await
}

pub async fn sync_badges(req: HttpRequest) -> ActixResult<HttpResponse> {
    BADGE_SERVICE.sync_badges(&req).await
}

pub fn configure_progress_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/progress")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .route("", web::get().to(list_my_progress)),
    )
    .service(
        web::scope("/api/v1/badges")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .route("", web::get().to(list_badges))
            .route("/sync", web::post().to(sync_badges)),
    );
}
