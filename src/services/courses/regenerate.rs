use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{CourseService, ensure_owner, load_course};
use super::create::llm_unavailable;
use crate::config::AppConfig;
use crate::models::{
    ApiResponse, ErrorCode,
    courses::{entities::CourseStatus, responses::CourseAcceptedResponse},
};
use crate::services::generation::{GenerationContext, spawn_course_generation};
use crate::services::{ServiceResult, current_user, error_response, finish, not_found};

pub async fn regenerate_course(
    _service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    finish(regenerate(request, course_id).await)
}

async fn regenerate(request: &HttpRequest, course_id: i64) -> ServiceResult {
    let user = current_user(request)?;
    let ctx = GenerationContext::from_request(request)?;

    let course = load_course(ctx.storage.as_ref(), course_id).await?;
    ensure_owner(&user, &course)?;

    if course.status == CourseStatus::Generating {
        return Err(already_generating());
    }
    if !ctx.llm.is_configured() {
        return Err(llm_unavailable());
    }

    let cost = AppConfig::get().credits.course_cost;
    let charge = ctx
        .charge(user.id, cost, format!("course regeneration: #{course_id}"))
        .await
        .map_err(|e| error_response(&e))?;
    let credits_remaining = charge.map(|t| t.balance_after).unwrap_or(user.credits);

    let reset = match ctx.storage.reset_course_for_regeneration(course_id, cost).await {
        Ok(Some(course)) => course,
        Ok(None) => {
            // 并发请求已抢先进入 generating，或课程已被删除
            let still_exists = matches!(ctx.storage.get_course_by_id(course_id).await, Ok(Some(_)));
            if still_exists {
                ctx.refund(user.id, cost, format!("refund: course #{course_id} already generating"))
                    .await;
                return Err(already_generating());
            }
            ctx.refund(user.id, cost, format!("refund: course #{course_id} no longer exists"))
                .await;
            return Err(not_found(ErrorCode::CourseNotFound, "Course not found"));
        }
        Err(e) => {
            ctx.refund(user.id, cost, format!("refund: course #{course_id} reset failed"))
                .await;
            return Err(error_response(&e));
        }
    };

    info!("User {} regenerating course {}", user.id, course_id);
    spawn_course_generation(ctx, reset.clone());

    Ok(HttpResponse::Accepted().json(ApiResponse::success(
        CourseAcceptedResponse {
            course: reset,
            credits_remaining,
        },
        "Course regeneration started",
    )))
}

fn already_generating() -> HttpResponse {
    HttpResponse::Conflict().json(ApiResponse::error_empty(
        ErrorCode::CourseNotReady,
        "Course is already being generated",
    ))
}
