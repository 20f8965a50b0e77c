use std::collections::HashSet;

use super::SeaOrmStorage;
use crate::entity::badges::{
    ActiveModel as BadgeActiveModel, Column as BadgeColumn, Entity as Badges,
};
use crate::entity::progress::{ActiveModel, Column, Entity as ProgressRecords};
use crate::errors::{LearnHubError, Result};
use crate::models::progress::entities::{Badge, BadgeKey, Progress};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr};

impl SeaOrmStorage {
    /// 写入或覆盖 (user_id, course_id) 的学习进度
    pub async fn upsert_progress_impl(
        &self,
        user_id: i64,
        course_id: i64,
        completed_chapters: Vec<i32>,
        percent: i32,
    ) -> Result<Progress> {
        let now = chrono::Utc::now().timestamp();
        let raw = serde_json::to_string(&completed_chapters)?;

        let existing = ProgressRecords::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习进度失败: {e}")))?;

        let result = match existing {
            Some(model) => {
                let mut active: ActiveModel = model.into();
                active.completed_chapters = Set(raw);
                active.percent = Set(percent);
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(|e| {
                    LearnHubError::database_operation(format!("更新学习进度失败: {e}"))
                })?
            }
            None => ActiveModel {
                user_id: Set(user_id),
                course_id: Set(course_id),
                completed_chapters: Set(raw),
                percent: Set(percent),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("创建学习进度失败: {e}")))?,
        };

        Ok(result.into_progress())
    }

    pub async fn get_progress_impl(&self, user_id: i64, course_id: i64) -> Result<Option<Progress>> {
        let result = ProgressRecords::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习进度失败: {e}")))?;

        Ok(result.map(|m| m.into_progress()))
    }

    pub async fn list_progress_by_user_impl(&self, user_id: i64) -> Result<Vec<Progress>> {
        let records = ProgressRecords::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::UpdatedAt)
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习进度失败: {e}")))?;

        Ok(records.into_iter().map(|m| m.into_progress()).collect())
    }

    pub async fn list_badges_by_user_impl(&self, user_id: i64) -> Result<Vec<Badge>> {
        let badges = Badges::find()
            .filter(BadgeColumn::UserId.eq(user_id))
            .order_by_asc(BadgeColumn::AwardedAt)
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询徽章失败: {e}")))?;

        Ok(badges.into_iter().filter_map(|m| m.into_badge()).collect())
    }

    /// 授予尚未持有的徽章
    pub async fn award_badges_impl(&self, user_id: i64, keys: &[BadgeKey]) -> Result<Vec<Badge>> {
        let held: HashSet<BadgeKey> = self
            .list_badges_by_user_impl(user_id)
            .await?
            .into_iter()
            .map(|b| b.badge_key)
            .collect();

        let now = chrono::Utc::now().timestamp();
        let mut awarded = Vec::new();
        let mut seen = HashSet::new();

        for key in keys {
            if held.contains(key) || !seen.insert(*key) {
                continue;
            }

            let inserted = BadgeActiveModel {
                user_id: Set(user_id),
                badge_key: Set(key.to_string()),
                awarded_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await;

            let model = match inserted {
                Ok(model) => model,
                // 并发授予时另一请求已写入，视为已持有
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    continue;
                }
                Err(e) => {
                    return Err(LearnHubError::database_operation(format!(
                        "授予徽章失败: {e}"
                    )));
                }
            };

            if let Some(badge) = model.into_badge() {
                awarded.push(badge);
            }
        }

        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::storage_with_user;
    use super::*;

    #[tokio::test]
    async fn test_award_badges_is_idempotent() {
        let (storage, user) = storage_with_user(0).await;
        let keys = [BadgeKey::FirstCourse, BadgeKey::FirstCourse, BadgeKey::PerfectQuiz];

        let first = storage.award_badges_impl(user.id, &keys).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = storage.award_badges_impl(user.id, &keys).await.unwrap();
        assert!(second.is_empty());

        let held = storage.list_badges_by_user_impl(user.id).await.unwrap();
        assert_eq!(held.len(), 2);
    }

    #[tokio::test]
    async fn test_award_badges_tolerates_existing_row() {
        let (storage, user) = storage_with_user(0).await;
        // 模拟另一请求在读取已持有徽章之后写入
        BadgeActiveModel {
            user_id: Set(user.id),
            badge_key: Set(BadgeKey::FirstCompletion.to_string()),
            awarded_at: Set(0),
            ..Default::default()
        }
        .insert(&storage.db)
        .await
        .unwrap();

        let err = BadgeActiveModel {
            user_id: Set(user.id),
            badge_key: Set(BadgeKey::FirstCompletion.to_string()),
            awarded_at: Set(0),
            ..Default::default()
        }
        .insert(&storage.db)
        .await
        .unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));

        let awarded = storage
            .award_badges_impl(user.id, &[BadgeKey::FirstCompletion])
            .await
            .unwrap();
        assert!(awarded.is_empty());
    }
}
