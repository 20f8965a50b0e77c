use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{CourseService, can_manage, load_course};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{ServiceResult, current_user, error_response, finish, forbidden, not_found};

pub async fn delete_course(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    finish(delete(service, request, course_id).await)
}

async fn delete(service: &CourseService, request: &HttpRequest, course_id: i64) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let course = load_course(storage.as_ref(), course_id).await?;
    if !can_manage(&user, &course) {
        return Err(forbidden(
            ErrorCode::CoursePermissionDenied,
            "You do not have permission to delete this course",
        ));
    }

    // 资料、进度与提交随课程级联删除
    let deleted = storage
        .delete_course(course_id)
        .await
        .map_err(|e| error_response(&e))?;
    if !deleted {
        return Err(not_found(ErrorCode::CourseNotFound, "Course not found"));
    }

    info!("Course {} deleted by user {}", course_id, user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Course deleted")))
}
