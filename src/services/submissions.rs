//! 答题提交与 AI 评分
//!
//! 评分在请求内同步完成。模型输出不合法时提交标记为 `failed` 并正常返回；
//! 上游不可用时同样标记 `failed`，但响应 502。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::LearnHubError;
use crate::integrations::{ExternalError, LlmClient, generate_json, prompts};
use crate::models::{
    ApiResponse, ErrorCode,
    courses::entities::Course,
    submissions::{
        entities::{GradingResult, Submission, SubmissionStatus},
        requests::{CreateSubmissionRequest, SubmissionListParams, SubmissionListQuery},
    },
};
use crate::storage::Storage;
use crate::utils::validate::validate_text;

use super::badges::sync_badges;
use super::courses::{create::llm_unavailable, ensure_can_view, load_course};
use super::{
    ServiceResult, app_data, bad_request, current_user, error_response, finish, forbidden,
    not_found,
};

const MAX_QUESTION_CHARS: usize = 2000;
const MAX_ANSWER_CHARS: usize = 10_000;

/// 调用模型评分，返回 0..=100 的分数与评语
pub async fn grade_answer(
    llm: &dyn LlmClient,
    course: &Course,
    chapter_index: i32,
    question: &str,
    answer: &str,
) -> Result<(i32, String), ExternalError> {
    let chapter = course.layout.as_ref().and_then(|l| l.chapter(chapter_index));
    let (system, prompt) = prompts::grade_answer(course, chapter, question, answer);
    let result: GradingResult = generate_json(llm, &system, &prompt).await?;
    let score = result
        .normalized_score()
        .ok_or_else(|| ExternalError::MalformedResponse(format!("invalid score {}", result.score)))?;
    Ok((score, result.feedback.trim().to_string()))
}

pub struct SubmissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl SubmissionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    pub async fn create_submission(
        &self,
        request: &HttpRequest,
        course_id: i64,
        submission: CreateSubmissionRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.create(request, course_id, submission).await)
    }

    async fn create(
        &self,
        request: &HttpRequest,
        course_id: i64,
        mut submission: CreateSubmissionRequest,
    ) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;
        let llm = app_data::<dyn LlmClient>(request)?;

        submission.question = submission.question.trim().to_string();
        submission.answer = submission.answer.trim().to_string();
        validate_text("Question", &submission.question, MAX_QUESTION_CHARS)
            .map_err(|msg| bad_request(ErrorCode::SubmissionInvalid, msg))?;
        validate_text("Answer", &submission.answer, MAX_ANSWER_CHARS)
            .map_err(|msg| bad_request(ErrorCode::SubmissionInvalid, msg))?;

        let course = load_course(storage.as_ref(), course_id).await?;
        ensure_can_view(&user, &course)?;
        if !course.is_ready() {
            return Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::CourseNotReady,
                "Course is not ready yet",
            )));
        }
        if !course.has_chapter(submission.chapter_index) {
            return Err(bad_request(
                ErrorCode::ChapterOutOfRange,
                "chapter_index is out of range",
            ));
        }
        if !llm.is_configured() {
            return Err(llm_unavailable());
        }

        let pending = storage
            .create_submission(course_id, user.id, submission)
            .await
            .map_err(|e| error_response(&e))?;

        let graded = grade_answer(
            llm.as_ref(),
            &course,
            pending.chapter_index,
            &pending.question,
            &pending.answer,
        )
        .await;

        match graded {
            Ok((score, feedback)) => {
                let saved = self
                    .record(storage.as_ref(), &pending, SubmissionStatus::Graded, Some(score), Some(feedback))
                    .await?;
                info!("Submission {} graded {}/100", saved.id, score);

                if score == 100 {
                    if let Err(e) = sync_badges(storage.as_ref(), user.id).await {
                        warn!("Badge sync after grading failed for user {}: {}", user.id, e);
                    }
                }
                Ok(HttpResponse::Created().json(ApiResponse::success(saved, "Submission graded")))
            }
            Err(ExternalError::MalformedResponse(reason)) => {
                warn!("Grader returned an unusable result for submission {}: {}", pending.id, reason);
                let saved = self
                    .record(
                        storage.as_ref(),
                        &pending,
                        SubmissionStatus::Failed,
                        None,
                        Some("Automatic grading failed, please resubmit".to_string()),
                    )
                    .await?;
                Ok(HttpResponse::Ok().json(ApiResponse::error(
                    ErrorCode::GradingFailed,
                    saved,
                    "Submission saved but could not be graded",
                )))
            }
            Err(e) => {
                self.record(storage.as_ref(), &pending, SubmissionStatus::Failed, None, None)
                    .await?;
                Err(error_response(&LearnHubError::from(e)))
            }
        }
    }

    async fn record(
        &self,
        storage: &dyn Storage,
        pending: &Submission,
        status: SubmissionStatus,
        score: Option<i32>,
        feedback: Option<String>,
    ) -> Result<Submission, HttpResponse> {
        storage
            .record_grade(pending.id, status, score, feedback)
            .await
            .map_err(|e| error_response(&e))?
            .ok_or_else(|| not_found(ErrorCode::SubmissionNotFound, "Submission not found"))
    }

    // 普通用户只能看到自己的提交，教职人员可按学生筛选
    pub async fn list_submissions(
        &self,
        request: &HttpRequest,
        course_id: i64,
        params: SubmissionListParams,
    ) -> ActixResult<HttpResponse> {
        finish(self.list(request, course_id, params).await)
    }

    async fn list(&self, request: &HttpRequest, course_id: i64, params: SubmissionListParams) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let course = load_course(storage.as_ref(), course_id).await?;
        ensure_can_view(&user, &course)?;

        let user_id = if user.role.is_staff() {
            params.user_id
        } else {
            Some(user.id)
        };
        let page = storage
            .list_submissions_with_pagination(SubmissionListQuery {
                page: Some(params.pagination.page),
                size: Some(params.pagination.size),
                course_id,
                user_id,
            })
            .await
            .map_err(|e| error_response(&e))?;

        Ok(HttpResponse::Ok().json(ApiResponse::success(page, "Submissions retrieved")))
    }

    pub async fn get_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        finish(self.get(request, submission_id).await)
    }

    async fn get(&self, request: &HttpRequest, submission_id: i64) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let submission = storage
            .get_submission_by_id(submission_id)
            .await
            .map_err(|e| error_response(&e))?
            .ok_or_else(|| not_found(ErrorCode::SubmissionNotFound, "Submission not found"))?;

        if submission.user_id != user.id && !user.role.is_staff() {
            return Err(forbidden(
                ErrorCode::Forbidden,
                "You do not have access to this submission",
            ));
        }

        Ok(HttpResponse::Ok().json(ApiResponse::success(submission, "Submission retrieved")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::{CourseStatus, CourseType, Difficulty};
    use async_trait::async_trait;

    struct CannedLlm(Result<&'static str, ExternalError>);

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExternalError> {
            self.0.clone().map(str::to_string)
        }
    }

    fn course() -> Course {
        Course {
            id: 2,
            creator_id: 1,
            topic: "Borrow checker".into(),
            title: Some("Borrowing".into()),
            course_type: CourseType::Standard,
            difficulty: Difficulty::Moderate,
            layout: None,
            status: CourseStatus::Ready,
            chapter_count: 2,
            requested_chapters: 2,
            credits_charged: 20,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_score_is_clamped_and_feedback_trimmed() {
        let llm = CannedLlm(Ok(r#"{"score": 140, "feedback": "  Great answer. "}"#));
        let (score, feedback) = grade_answer(&llm, &course(), 0, "Q", "A").await.unwrap();
        assert_eq!(score, 100);
        assert_eq!(feedback, "Great answer.");
    }

    #[tokio::test]
    async fn test_unparseable_grade_is_malformed() {
        let llm = CannedLlm(Ok("I think this deserves a B+"));
        let err = grade_answer(&llm, &course(), 0, "Q", "A").await.unwrap_err();
        assert!(matches!(err, ExternalError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_is_passed_through() {
        let llm = CannedLlm(Err(ExternalError::RateLimited {
            retry_after_secs: Some(3),
        }));
        let err = grade_answer(&llm, &course(), 1, "Q", "A").await.unwrap_err();
        assert_eq!(
            err,
            ExternalError::RateLimited {
                retry_after_secs: Some(3)
            }
        );
    }
}
