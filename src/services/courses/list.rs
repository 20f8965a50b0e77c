use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::CourseService;
use crate::models::{
    ApiResponse,
    courses::requests::{CourseListParams, CourseListQuery},
    users::entities::UserRole,
};
use crate::services::{ServiceResult, current_user, error_response, finish};

pub async fn list_courses(
    service: &CourseService,
    request: &HttpRequest,
    params: CourseListParams,
) -> ActixResult<HttpResponse> {
    finish(list(service, request, params).await)
}

async fn list(service: &CourseService, request: &HttpRequest, params: CourseListParams) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let creator_id = match user.role {
        UserRole::Admin => None,
        _ => Some(user.id),
    };
    let search = params
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let page = storage
        .list_courses_with_pagination(CourseListQuery {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            creator_id,
            status: params.status,
            search,
        })
        .await
        .map_err(|e| error_response(&e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(page, "Courses retrieved")))
}
