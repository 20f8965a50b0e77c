use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{
    ApiResponse, ErrorCode,
    progress::{
        entities::compute_percent, requests::UpdateProgressRequest, responses::ProgressListResponse,
    },
};
use crate::storage::Storage;

use super::badges::sync_badges;
use super::courses::{ensure_can_view, load_course};
use super::{ServiceResult, app_data, current_user, error_response, finish};

/// 去重、排序并丢弃越界章节
fn normalize_chapters(completed: &[i32], chapter_count: i32) -> Vec<i32> {
    let mut chapters: Vec<i32> = completed
        .iter()
        .copied()
        .filter(|c| *c >= 0 && *c < chapter_count)
        .collect();
    chapters.sort_unstable();
    chapters.dedup();
    chapters
}

pub struct ProgressService {
    storage: Option<Arc<dyn Storage>>,
}

impl ProgressService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    // 当前用户在某课程的进度，尚未开始时 data 为 null
    pub async fn get_progress(&self, request: &HttpRequest, course_id: i64) -> ActixResult<HttpResponse> {
        finish(self.get(request, course_id).await)
    }

    async fn get(&self, request: &HttpRequest, course_id: i64) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let course = load_course(storage.as_ref(), course_id).await?;
        ensure_can_view(&user, &course)?;

        let progress = storage
            .get_progress(user.id, course_id)
            .await
            .map_err(|e| error_response(&e))?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(progress, "Progress retrieved")))
    }

    pub async fn update_progress(
        &self,
        request: &HttpRequest,
        course_id: i64,
        update: UpdateProgressRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.update(request, course_id, update).await)
    }

    async fn update(
        &self,
        request: &HttpRequest,
        course_id: i64,
        update: UpdateProgressRequest,
    ) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let course = load_course(storage.as_ref(), course_id).await?;
        ensure_can_view(&user, &course)?;
        if !course.is_ready() {
            return Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::CourseNotReady,
                "Course is not ready yet",
            )));
        }

        let chapters = normalize_chapters(&update.completed_chapters, course.chapter_count);
        let percent = compute_percent(&chapters, course.chapter_count);

        let progress = storage
            .upsert_progress(user.id, course_id, chapters, percent)
            .await
            .map_err(|e| error_response(&e))?;

        // 徽章同步失败不影响进度保存
        if let Err(e) = sync_badges(storage.as_ref(), user.id).await {
            tracing::warn!("Badge sync after progress update failed for user {}: {}", user.id, e);
        }

        Ok(HttpResponse::Ok().json(ApiResponse::success(progress, "Progress updated")))
    }

    pub async fn list_my_progress(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        finish(self.list(request).await)
    }

    async fn list(&self, request: &HttpRequest) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let items = storage
            .list_progress_by_user(user.id)
            .await
            .map_err(|e| error_response(&e))?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(
            ProgressListResponse { items },
            "Progress retrieved",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chapters() {
        assert_eq!(normalize_chapters(&[3, 1, 1, 9, -2, 0], 4), vec![0, 1, 3]);
        assert!(normalize_chapters(&[0, 1], 0).is_empty());
    }
}
