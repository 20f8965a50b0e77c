use super::{SeaOrmStorage, page_params};
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{LearnHubError, Result};
use crate::models::{
    PaginatedResponse, PaginationInfo,
    submissions::{
        entities::{Submission, SubmissionStatus},
        requests::{CreateSubmissionRequest, SubmissionListQuery},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    /// 创建提交，初始状态为 pending
    pub async fn create_submission_impl(
        &self,
        course_id: i64,
        user_id: i64,
        req: CreateSubmissionRequest,
    ) -> Result<Submission> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            course_id: Set(course_id),
            user_id: Set(user_id),
            chapter_index: Set(req.chapter_index),
            question: Set(req.question),
            answer: Set(req.answer),
            score: Set(None),
            feedback: Set(None),
            status: Set(SubmissionStatus::Pending.to_string()),
            submitted_at: Set(now),
            graded_at: Set(None),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("创建提交失败: {e}")))?;

        Ok(result.into_submission())
    }

    pub async fn get_submission_by_id_impl(&self, submission_id: i64) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    pub async fn list_submissions_with_pagination_impl(
        &self,
        query: SubmissionListQuery,
    ) -> Result<PaginatedResponse<Submission>> {
        let (page, size) = page_params(query.page, query.size);

        let mut select = Submissions::find().filter(Column::CourseId.eq(query.course_id));

        if let Some(user_id) = query.user_id {
            select = select.filter(Column::UserId.eq(user_id));
        }

        select = select
            .order_by_desc(Column::SubmittedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询提交总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询提交页数失败: {e}")))?;

        let submissions = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询提交列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: submissions
                .into_iter()
                .map(|m| m.into_submission())
                .collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 记录评分结果
    pub async fn record_grade_impl(
        &self,
        submission_id: i64,
        status: SubmissionStatus,
        score: Option<i32>,
        feedback: Option<String>,
    ) -> Result<Option<Submission>> {
        let Some(existing) = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询提交失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        model.status = Set(status.to_string());
        model.score = Set(score);
        model.feedback = Set(feedback);
        model.graded_at = Set(Some(chrono::Utc::now().timestamp()));

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新评分失败: {e}")))?;

        Ok(Some(updated.into_submission()))
    }

    pub async fn count_perfect_submissions_impl(&self, user_id: i64) -> Result<u64> {
        Submissions::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq(SubmissionStatus::Graded.to_string()))
            .filter(Column::Score.eq(100))
            .count(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("统计满分提交失败: {e}")))
    }
}
