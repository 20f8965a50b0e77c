use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::courses::requests::{CourseListParams, CreateCourseRequest};
use crate::services::CourseService;
use crate::utils::SafeCourseIdI64;

use super::{materials, progress, submissions};

// 懒加载的全局 COURSE_SERVICE 实例
static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);

pub async fn list_courses(
    req: HttpRequest,
    query: web::Query<CourseListParams>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_courses(&req, query.into_inner()).await
}

pub async fn create_course(
    req: HttpRequest,
    course_data: web::Json<CreateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_course(&req, course_data.into_inner())
        .await
}

pub async fn get_course(req: HttpRequest, course_id: SafeCourseIdI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.get_course(&req, course_id.0).await
}

pub async fn delete_course(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.delete_course(&req, course_id.0).await
}

pub async fn regenerate_course(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.regenerate_course(&req, course_id.0).await
}

// 配置路由：课程本身与其下的资料、进度、提交
pub fn configure_courses_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/courses")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_courses))
                    // 生成类请求单独限流
                    .route(
                        web::post()
                            .to(create_course)
                            .wrap(RateLimit::generation()),
                    ),
            )
            .service(
                web::resource("/{course_id}")
                    .route(web::get().to(get_course))
                    .route(web::delete().to(delete_course)),
            )
            .service(
                web::resource("/{course_id}/regenerate").route(
                    web::post()
                        .to(regenerate_course)
                        .wrap(RateLimit::generation()),
                ),
            )
            .service(
                web::resource("/{course_id}/materials")
                    .route(web::get().to(materials::list_materials))
                    .route(
                        web::post()
                            .to(materials::generate_material)
                            .wrap(RateLimit::generation()),
                    ),
            )
            .service(
                web::resource("/{course_id}/progress")
                    .route(web::get().to(progress::get_progress))
                    .route(web::put().to(progress::update_progress)),
            )
            .service(
                web::resource("/{course_id}/submissions")
                    .route(web::get().to(submissions::list_submissions))
                    .route(
                        web::post()
                            .to(submissions::create_submission)
                            .wrap(RateLimit::generation()),
                    ),
            ),
    );
}
