use super::{SeaOrmStorage, page_params};
use crate::entity::courses::{ActiveModel, Column, Entity as Courses};
use crate::errors::{LearnHubError, Result};
use crate::models::{
    PaginatedResponse, PaginationInfo,
    courses::{
        entities::{Course, CourseLayout, CourseStatus},
        requests::{CourseListQuery, NewCourse},
    },
};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, sea_query::Expr,
};

impl SeaOrmStorage {
    /// 创建课程，初始状态为 generating
    pub async fn create_course_impl(&self, course: NewCourse) -> Result<Course> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            creator_id: Set(course.creator_id),
            topic: Set(course.topic),
            title: Set(None),
            course_type: Set(course.course_type.to_string()),
            difficulty: Set(course.difficulty.to_string()),
            layout: Set(None),
            status: Set(CourseStatus::Generating.to_string()),
            chapter_count: Set(course.chapter_count),
            requested_chapters: Set(course.chapter_count),
            credits_charged: Set(course.credits_charged),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("创建课程失败: {e}")))?;

        Ok(result.into_course())
    }

    pub async fn get_course_by_id_impl(&self, course_id: i64) -> Result<Option<Course>> {
        let result = Courses::find_by_id(course_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询课程失败: {e}")))?;

        Ok(result.map(|m| m.into_course()))
    }

    /// 分页列出课程
    pub async fn list_courses_with_pagination_impl(
        &self,
        query: CourseListQuery,
    ) -> Result<PaginatedResponse<Course>> {
        let (page, size) = page_params(query.page, query.size);

        let mut select = Courses::find();

        if let Some(creator_id) = query.creator_id {
            select = select.filter(Column::CreatorId.eq(creator_id));
        }

        if let Some(ref status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(
                Condition::any()
                    .add(Column::Topic.contains(&escaped))
                    .add(Column::Title.contains(&escaped)),
            );
        }

        select = select.order_by_desc(Column::CreatedAt);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询课程总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询课程页数失败: {e}")))?;

        let courses = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: courses.into_iter().map(|m| m.into_course()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 写入大纲，章节数以大纲为准
    pub async fn save_course_layout_impl(
        &self,
        course_id: i64,
        layout: &CourseLayout,
    ) -> Result<Option<Course>> {
        let raw = serde_json::to_string(layout)?;
        let now = chrono::Utc::now().timestamp();

        let result = Courses::update_many()
            .col_expr(Column::Title, Expr::value(layout.title.clone()))
            .col_expr(Column::Layout, Expr::value(raw))
            .col_expr(Column::ChapterCount, Expr::value(layout.chapters.len() as i32))
            .col_expr(Column::Status, Expr::value(CourseStatus::Ready.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(course_id))
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("保存课程大纲失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_course_by_id_impl(course_id).await
    }

    pub async fn update_course_status_impl(
        &self,
        course_id: i64,
        status: CourseStatus,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = Courses::update_many()
            .col_expr(Column::Status, Expr::value(status.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(course_id))
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新课程状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 清空大纲并回到 generating，已生成的资料保留到被新内容覆盖
    ///
    /// 仅在课程不处于 generating 时生效，否则返回 None
    pub async fn reset_course_for_regeneration_impl(
        &self,
        course_id: i64,
        credits_charged: i64,
    ) -> Result<Option<Course>> {
        let now = chrono::Utc::now().timestamp();

        let result = Courses::update_many()
            .col_expr(Column::Layout, Expr::value(Option::<String>::None))
            .col_expr(
                Column::Status,
                Expr::value(CourseStatus::Generating.to_string()),
            )
            .col_expr(Column::CreditsCharged, Expr::value(credits_charged))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(course_id))
            .filter(Column::Status.ne(CourseStatus::Generating.to_string()))
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("重置课程失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_course_by_id_impl(course_id).await
    }

    pub async fn delete_course_impl(&self, course_id: i64) -> Result<bool> {
        let result = Courses::delete_by_id(course_id)
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("删除课程失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_courses_impl(&self) -> Result<u64> {
        Courses::find()
            .count(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("统计课程数量失败: {e}")))
    }

    pub async fn count_courses_by_status_impl(&self, status: CourseStatus) -> Result<u64> {
        Courses::find()
            .filter(Column::Status.eq(status.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("统计课程数量失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{seed_course, storage_with_user};
    use super::*;

    #[tokio::test]
    async fn test_reset_skips_course_already_generating() {
        let (storage, user) = storage_with_user(100).await;
        let course = seed_course(&storage, user.id, 20).await;
        assert_eq!(course.status, CourseStatus::Generating);

        let reset = storage
            .reset_course_for_regeneration_impl(course.id, 20)
            .await
            .unwrap();
        assert!(reset.is_none());

        storage
            .update_course_status_impl(course.id, CourseStatus::Ready)
            .await
            .unwrap();
        let first = storage
            .reset_course_for_regeneration_impl(course.id, 25)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, CourseStatus::Generating);
        assert_eq!(first.credits_charged, 25);

        let second = storage
            .reset_course_for_regeneration_impl(course.id, 25)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_reset_missing_course() {
        let (storage, _) = storage_with_user(0).await;
        let reset = storage
            .reset_course_for_regeneration_impl(404, 20)
            .await
            .unwrap();
        assert!(reset.is_none());
        assert!(storage.get_course_by_id_impl(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requested_chapters_survive_layout() {
        let (storage, user) = storage_with_user(0).await;
        let course = seed_course(&storage, user.id, 0).await;
        let layout = CourseLayout {
            title: "Rust".to_string(),
            summary: String::new(),
            chapters: Vec::new(),
        };
        let saved = storage
            .save_course_layout_impl(course.id, &layout)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.chapter_count, 0);
        assert_eq!(saved.requested_chapters, 3);
    }
}
