use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::submissions::requests::{CreateSubmissionRequest, SubmissionListParams};
use crate::services::SubmissionService;
use crate::utils::{SafeCourseIdI64, SafeSubmissionIdI64};

// 懒加载的全局 SUBMISSION_SERVICE 实例
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);

pub async fn list_submissions(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    query: web::Query<SubmissionListParams>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .list_submissions(&req, course_id.0, query.into_inner())
        .await
}

// 提交答案并同步评分
pub async fn create_submission(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    body: web::Json<CreateSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .create_submission(&req, course_id.0, body.into_inner())
        .await
}

pub async fn get_submission(
    req: HttpRequest,
    submission_id: SafeSubmissionIdI64,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE.get_submission(&req, submission_id.0).await
}

// 课程下的提交列表与创建在 courses 路由中注册
pub fn configure_submissions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .route("/{submission_id}", web::get().to(get_submission)),
    );
}
