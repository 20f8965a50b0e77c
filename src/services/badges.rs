//! 徽章规则
//!
//! 徽章由进度与提交统计推导，[`earned_badges`] 是纯函数，
//! 同步时只插入尚未持有的徽章。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::LearnHubError;
use crate::models::{
    ApiResponse,
    progress::{
        entities::{Badge, BadgeKey, Progress},
        responses::{BadgeListResponse, BadgeSyncResponse},
    },
};
use crate::storage::Storage;

use super::{ServiceResult, app_data, current_user, error_response, finish};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeStats {
    pub courses_started: usize,
    pub courses_completed: usize,
    pub perfect_submissions: u64,
}

impl BadgeStats {
    pub fn from_progress(progress: &[Progress], perfect_submissions: u64) -> Self {
        Self {
            courses_started: progress.len(),
            courses_completed: progress.iter().filter(|p| p.is_complete()).count(),
            perfect_submissions,
        }
    }
}

pub fn earned_badges(stats: &BadgeStats) -> Vec<BadgeKey> {
    let rules = [
        (BadgeKey::FirstCourse, stats.courses_started >= 1),
        (BadgeKey::FirstCompletion, stats.courses_completed >= 1),
        (BadgeKey::ThreeCompletions, stats.courses_completed >= 3),
        (BadgeKey::PerfectQuiz, stats.perfect_submissions >= 1),
    ];
    rules
        .into_iter()
        .filter_map(|(key, earned)| earned.then_some(key))
        .collect()
}

/// 重新计算并授予徽章，返回本次新增的部分
pub(crate) async fn sync_badges(storage: &dyn Storage, user_id: i64) -> Result<Vec<Badge>, LearnHubError> {
    let progress = storage.list_progress_by_user(user_id).await?;
    let perfect = storage.count_perfect_submissions(user_id).await?;
    let keys = earned_badges(&BadgeStats::from_progress(&progress, perfect));
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let awarded = storage.award_badges(user_id, &keys).await?;
    for badge in &awarded {
        tracing::info!(user_id, badge = %badge.badge_key, "Badge awarded");
    }
    Ok(awarded)
}

pub struct BadgeService {
    storage: Option<Arc<dyn Storage>>,
}

impl BadgeService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    pub async fn list_badges(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        finish(self.list(request).await)
    }

    async fn list(&self, request: &HttpRequest) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let items = storage
            .list_badges_by_user(user.id)
            .await
            .map_err(|e| error_response(&e))?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(
            BadgeListResponse { items },
            "Badges retrieved",
        )))
    }

    pub async fn sync_badges(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        finish(self.sync(request).await)
    }

    async fn sync(&self, request: &HttpRequest) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let awarded = sync_badges(storage.as_ref(), user.id)
            .await
            .map_err(|e| error_response(&e))?;
        let total = storage
            .list_badges_by_user(user.id)
            .await
            .map_err(|e| error_response(&e))?
            .len();

        Ok(HttpResponse::Ok().json(ApiResponse::success(
            BadgeSyncResponse { awarded, total },
            "Badges synchronized",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(percent: i32) -> Progress {
        Progress {
            id: 0,
            user_id: 1,
            course_id: 1,
            completed_chapters: vec![],
            percent,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_no_activity_earns_nothing() {
        assert!(earned_badges(&BadgeStats::default()).is_empty());
    }

    #[test]
    fn test_started_and_completed_courses() {
        let stats = BadgeStats::from_progress(&[progress(40), progress(100)], 0);
        assert_eq!(stats.courses_started, 2);
        assert_eq!(stats.courses_completed, 1);
        assert_eq!(
            earned_badges(&stats),
            vec![BadgeKey::FirstCourse, BadgeKey::FirstCompletion]
        );
    }

    #[test]
    fn test_three_completions_and_perfect_score() {
        let stats = BadgeStats::from_progress(&[progress(100), progress(100), progress(100)], 2);
        assert_eq!(earned_badges(&stats), BadgeKey::ALL.to_vec());
    }
}
