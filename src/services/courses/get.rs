use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{CourseService, ensure_can_view, load_course};
use crate::models::{ApiResponse, courses::responses::CourseDetailResponse};
use crate::services::{ServiceResult, current_user, error_response, finish};

pub async fn get_course(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    finish(get(service, request, course_id).await)
}

async fn get(service: &CourseService, request: &HttpRequest, course_id: i64) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let course = load_course(storage.as_ref(), course_id).await?;
    ensure_can_view(&user, &course)?;

    let materials = storage
        .list_materials(course_id, None)
        .await
        .map_err(|e| error_response(&e))?;
    let progress = storage
        .get_progress(user.id, course_id)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        CourseDetailResponse {
            course,
            materials,
            progress,
        },
        "Course retrieved",
    )))
}
