use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::models::{
    ApiResponse, ErrorCode,
    courses::entities::Course,
    materials::{
        entities::MaterialStatus,
        requests::{GenerateMaterialRequest, MaterialListParams},
    },
};
use crate::storage::Storage;

use super::courses::{create::llm_unavailable, ensure_can_view, ensure_owner, load_course};
use super::generation::{GenerationContext, spawn_material_generation};
use super::{ServiceResult, app_data, bad_request, current_user, error_response, finish};

pub struct MaterialService {
    storage: Option<Arc<dyn Storage>>,
}

/// 课程必须已就绪且章节存在
fn check_generatable(course: &Course, chapter_index: i32) -> Result<(), HttpResponse> {
    if !course.is_ready() {
        return Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::CourseNotReady,
            "Course is not ready yet",
        )));
    }
    if !course.has_chapter(chapter_index) {
        return Err(bad_request(
            ErrorCode::ChapterOutOfRange,
            format!(
                "chapter_index must be between 0 and {}",
                course.chapter_count - 1
            ),
        ));
    }
    Ok(())
}

impl MaterialService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    pub async fn list_materials(
        &self,
        request: &HttpRequest,
        course_id: i64,
        params: MaterialListParams,
    ) -> ActixResult<HttpResponse> {
        finish(self.list(request, course_id, params).await)
    }

    async fn list(&self, request: &HttpRequest, course_id: i64, params: MaterialListParams) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let course = load_course(storage.as_ref(), course_id).await?;
        ensure_can_view(&user, &course)?;

        let materials = storage
            .list_materials(course_id, params.material_type)
            .await
            .map_err(|e| error_response(&e))?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(materials, "Materials retrieved")))
    }

    // 为一个章节生成笔记、闪卡或测验，按份扣费
    pub async fn generate_material(
        &self,
        request: &HttpRequest,
        course_id: i64,
        generate_request: GenerateMaterialRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.generate(request, course_id, generate_request).await)
    }

    async fn generate(
        &self,
        request: &HttpRequest,
        course_id: i64,
        generate_request: GenerateMaterialRequest,
    ) -> ServiceResult {
        let user = current_user(request)?;
        let ctx = GenerationContext::from_request(request)?;
        let GenerateMaterialRequest {
            material_type,
            chapter_index,
        } = generate_request;

        let course = load_course(ctx.storage.as_ref(), course_id).await?;
        ensure_owner(&user, &course)?;
        check_generatable(&course, chapter_index)?;

        let existing = ctx
            .storage
            .get_material(course_id, material_type, chapter_index)
            .await
            .map_err(|e| error_response(&e))?;
        if existing.is_some_and(|m| m.status == MaterialStatus::Generating) {
            return Err(already_generating());
        }
        if !ctx.llm.is_configured() {
            return Err(llm_unavailable());
        }

        let cost = AppConfig::get().credits.material_cost;
        ctx.charge(
            user.id,
            cost,
            format!("{material_type} for course #{course_id} chapter {chapter_index}"),
        )
        .await
        .map_err(|e| error_response(&e))?;

        let material = match ctx
            .storage
            .claim_material(course_id, material_type, chapter_index)
            .await
        {
            Ok(Some(material)) => material,
            Ok(None) => {
                ctx.refund(
                    user.id,
                    cost,
                    format!("refund: {material_type} for course #{course_id} already generating"),
                )
                .await;
                return Err(already_generating());
            }
            Err(e) => {
                ctx.refund(
                    user.id,
                    cost,
                    format!("refund: {material_type} for course #{course_id} not started"),
                )
                .await;
                return Err(error_response(&e));
            }
        };

        info!(
            "User {} generating {} for course {} chapter {}",
            user.id, material_type, course_id, chapter_index
        );
        spawn_material_generation(ctx, course, user.id, material_type, chapter_index, cost);

        Ok(HttpResponse::Accepted().json(ApiResponse::success(
            material,
            "Material generation started",
        )))
    }
}

fn already_generating() -> HttpResponse {
    HttpResponse::Conflict().json(ApiResponse::error_empty(
        ErrorCode::ValidationFailed,
        "This material is already being generated",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::{CourseStatus, CourseType, Difficulty};
    use actix_web::http::StatusCode;

    fn course(status: CourseStatus) -> Course {
        Course {
            id: 3,
            creator_id: 1,
            topic: "Graphs".into(),
            title: Some("Graph Theory".into()),
            course_type: CourseType::ExamPrep,
            difficulty: Difficulty::Hard,
            layout: None,
            status,
            chapter_count: 3,
            requested_chapters: 3,
            credits_charged: 20,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_material_requires_ready_course_and_valid_chapter() {
        assert!(check_generatable(&course(CourseStatus::Ready), 2).is_ok());
        assert_eq!(
            check_generatable(&course(CourseStatus::Generating), 0)
                .unwrap_err()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            check_generatable(&course(CourseStatus::Ready), 3)
                .unwrap_err()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert!(check_generatable(&course(CourseStatus::Ready), -1).is_err());
    }
}
