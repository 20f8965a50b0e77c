use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::config::{AppConfig, GenerationConfig};
use crate::models::{
    ApiResponse, ErrorCode,
    courses::{
        requests::{CreateCourseRequest, NewCourse},
        responses::CourseAcceptedResponse,
    },
};
use crate::services::generation::{GenerationContext, spawn_course_generation};
use crate::services::{ServiceResult, bad_request, current_user, error_response, finish};
use crate::utils::validate::validate_topic;

/// 章节数缺省取配置值，超出 `1..=max_chapters` 时拒绝
pub(crate) fn resolve_chapter_count(
    requested: Option<i32>,
    settings: &GenerationConfig,
) -> Result<i32, String> {
    let count = requested.unwrap_or(settings.default_chapters);
    if count < 1 || count > settings.max_chapters {
        return Err(format!(
            "chapter_count must be between 1 and {}",
            settings.max_chapters
        ));
    }
    Ok(count)
}

/// 大模型未配置时不扣费，直接拒绝
pub(crate) fn llm_unavailable() -> HttpResponse {
    HttpResponse::BadGateway().json(ApiResponse::error_empty(
        ErrorCode::AiServiceUnavailable,
        "AI generation is not configured on this server",
    ))
}

pub async fn create_course(
    _service: &CourseService,
    request: &HttpRequest,
    create_request: CreateCourseRequest,
) -> ActixResult<HttpResponse> {
    finish(create(request, create_request).await)
}

async fn create(request: &HttpRequest, create_request: CreateCourseRequest) -> ServiceResult {
    let user = current_user(request)?;
    let config = AppConfig::get();

    let topic = create_request.topic.trim().to_string();
    validate_topic(&topic).map_err(|msg| bad_request(ErrorCode::CourseTopicInvalid, msg))?;
    let chapter_count = resolve_chapter_count(create_request.chapter_count, &config.generation)
        .map_err(|msg| bad_request(ErrorCode::ValidationFailed, msg))?;

    let ctx = GenerationContext::from_request(request)?;
    if !ctx.llm.is_configured() {
        return Err(llm_unavailable());
    }

    // 1. 先扣费，余额不足返回 402
    let cost = config.credits.course_cost;
    let charge = ctx
        .charge(user.id, cost, format!("course generation: {topic}"))
        .await
        .map_err(|e| error_response(&e))?;
    let credits_remaining = charge.map(|t| t.balance_after).unwrap_or(user.credits);

    // 2. 写入课程，失败时退款
    let course = match ctx
        .storage
        .create_course(NewCourse {
            creator_id: user.id,
            topic: topic.clone(),
            course_type: create_request.course_type,
            difficulty: create_request.difficulty,
            chapter_count,
            credits_charged: cost,
        })
        .await
    {
        Ok(course) => course,
        Err(e) => {
            tracing::error!("Failed to create course for user {}: {}", user.id, e);
            ctx.refund(user.id, cost, format!("refund: course creation failed: {topic}"))
                .await;
            return Err(HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::CourseCreationFailed,
                "Course creation failed, credits were refunded",
            )));
        }
    };

    info!(
        "User {} requested course {} on '{}' ({} chapters)",
        user.id, course.id, topic, chapter_count
    );

    // 3. 后台生成
    spawn_course_generation(ctx, course.clone());

    Ok(HttpResponse::Accepted().json(ApiResponse::success(
        CourseAcceptedResponse {
            course,
            credits_remaining,
        },
        "Course generation started",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_count_defaults_and_bounds() {
        let settings = GenerationConfig {
            default_chapters: 5,
            max_chapters: 8,
            notes_on_create: false,
        };
        assert_eq!(resolve_chapter_count(None, &settings), Ok(5));
        assert_eq!(resolve_chapter_count(Some(8), &settings), Ok(8));
        assert!(resolve_chapter_count(Some(0), &settings).is_err());
        assert!(resolve_chapter_count(Some(9), &settings).is_err());
    }
}
