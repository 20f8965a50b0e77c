use crate::integrations::{ExternalError, LlmClient, generate_json, prompts};
use crate::models::courses::entities::{Course, CourseLayout, CourseStatus};
use crate::models::materials::entities::{MaterialStatus, MaterialType};
use crate::services::notifications;

use super::GenerationContext;
use super::material::run_material_generation;

/// 生成课程大纲
///
/// 按创建时请求的章节数生成，模型多给的章节会被截断；结构不合法视为 `MalformedResponse`。
pub async fn generate_layout(llm: &dyn LlmClient, course: &Course) -> Result<CourseLayout, ExternalError> {
    let (system, prompt) = prompts::course_layout(
        &course.topic,
        course.course_type,
        course.difficulty,
        course.requested_chapters,
    );
    let mut layout: CourseLayout = generate_json(llm, &system, &prompt).await?;

    let limit = usize::try_from(course.requested_chapters).unwrap_or(0);
    if limit > 0 {
        layout.chapters.truncate(limit);
    }
    layout.validate().map_err(ExternalError::MalformedResponse)?;
    Ok(layout)
}

pub(crate) async fn run_course_generation(ctx: &GenerationContext, course: Course) -> CourseStatus {
    let course_id = course.id;
    tracing::info!(course_id, topic = %course.topic, "Generating course");

    let layout = match generate_layout(ctx.llm.as_ref(), &course).await {
        Ok(layout) => layout,
        Err(e) => {
            tracing::error!(course_id, "Course layout generation failed: {e}");
            fail_course(ctx, &course).await;
            return CourseStatus::Failed;
        }
    };

    let ready = match ctx.storage.save_course_layout(course_id, &layout).await {
        Ok(Some(course)) => course,
        Ok(None) => {
            // 生成期间课程被删除
            tracing::warn!(course_id, "Course disappeared during generation");
            return CourseStatus::Failed;
        }
        Err(e) => {
            tracing::error!(course_id, "Failed to save course layout: {e}");
            fail_course(ctx, &course).await;
            return CourseStatus::Failed;
        }
    };

    if ctx.notes_on_create {
        let mut failed = 0;
        for index in 0..ready.chapter_count {
            if run_material_generation(ctx, &ready, MaterialType::Notes, index).await
                == MaterialStatus::Failed
            {
                failed += 1;
            }
        }
        if failed > 0 {
            tracing::warn!(course_id, failed, "Some chapter notes could not be generated");
        }
    }

    match ctx.storage.get_user_by_id(ready.creator_id).await {
        Ok(Some(user)) => ctx.notify(notifications::course_ready(&user, &ready)),
        Ok(None) => {}
        Err(e) => tracing::warn!(course_id, "Failed to load course creator: {e}"),
    }

    tracing::info!(course_id, chapters = ready.chapter_count, "Course ready");
    CourseStatus::Ready
}

// 标记失败、退款并通知创建者
async fn fail_course(ctx: &GenerationContext, course: &Course) {
    if let Err(e) = ctx
        .storage
        .update_course_status(course.id, CourseStatus::Failed)
        .await
    {
        tracing::error!(course_id = course.id, "Failed to mark course as failed: {e}");
    }

    let refunded = ctx
        .refund(
            course.creator_id,
            course.credits_charged,
            format!("refund: course #{} generation failed", course.id),
        )
        .await
        .map(|t| t.amount)
        .unwrap_or(0);

    match ctx.storage.get_user_by_id(course.creator_id).await {
        Ok(Some(user)) => ctx.notify(notifications::course_failed(&user, course, refunded)),
        Ok(None) => {}
        Err(e) => tracing::warn!(course_id = course.id, "Failed to load course creator: {e}"),
    }
}

pub fn spawn_course_generation(ctx: GenerationContext, course: Course) {
    tokio::spawn(async move {
        run_course_generation(&ctx, course).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::{CourseType, Difficulty};
    use async_trait::async_trait;

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExternalError> {
            Ok(self.0.to_string())
        }
    }

    fn course(chapters: i32) -> Course {
        Course {
            id: 7,
            creator_id: 2,
            topic: "SQL joins".into(),
            title: None,
            course_type: CourseType::CrashCourse,
            difficulty: Difficulty::Moderate,
            layout: None,
            status: CourseStatus::Generating,
            chapter_count: chapters,
            requested_chapters: chapters,
            credits_charged: 20,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    const THREE_CHAPTERS: &str = r#"{"title":"Joins","chapters":[{"title":"Inner"},{"title":"Outer"},{"title":"Cross"}]}"#;

    #[tokio::test]
    async fn test_extra_chapters_are_truncated() {
        let layout = generate_layout(&CannedLlm(THREE_CHAPTERS), &course(2))
            .await
            .unwrap();
        assert_eq!(layout.chapters.len(), 2);
        assert_eq!(layout.chapters[1].title, "Outer");
    }

    #[tokio::test]
    async fn test_fewer_chapters_are_kept() {
        let layout = generate_layout(&CannedLlm(THREE_CHAPTERS), &course(5))
            .await
            .unwrap();
        assert_eq!(layout.chapters.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_layout_is_malformed() {
        let err = generate_layout(&CannedLlm(r#"{"title":"Joins","chapters":[]}"#), &course(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::MalformedResponse(_)));
    }

    struct DownLlm;

    #[async_trait]
    impl LlmClient for DownLlm {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExternalError> {
            Err(ExternalError::Unavailable("HTTP 503: overloaded".into()))
        }
    }

    #[tokio::test]
    async fn test_layout_keeps_requested_chapters_after_short_outline() {
        let mut regenerated = course(2);
        regenerated.requested_chapters = 3;
        let layout = generate_layout(&CannedLlm(THREE_CHAPTERS), &regenerated)
            .await
            .unwrap();
        assert_eq!(layout.chapters.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_course_is_marked_and_refunded() {
        use crate::models::credits::{entities::CreditKind, requests::CreditChange};
        use crate::storage::Storage;
        use crate::storage::sea_orm_storage::fixtures::{seed_course, storage_with_user};
        use std::sync::Arc;

        let (storage, user) = storage_with_user(100).await;
        storage
            .apply_credit_change(CreditChange {
                user_id: user.id,
                amount: -20,
                kind: CreditKind::Deduction,
                reason: "course creation".into(),
            })
            .await
            .unwrap();
        let seeded = seed_course(&storage, user.id, 20).await;

        let storage: Arc<dyn Storage> = Arc::new(storage);
        let ctx = GenerationContext {
            storage: storage.clone(),
            llm: Arc::new(DownLlm),
            mailer: None,
            cache: None,
            notes_on_create: false,
        };

        assert_eq!(run_course_generation(&ctx, seeded.clone()).await, CourseStatus::Failed);

        let stored = storage.get_course_by_id(seeded.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CourseStatus::Failed);

        let refunds = storage
            .list_credit_transactions(Some(user.id), Some(CreditKind::Refund))
            .await
            .unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, seeded.credits_charged);

        let creator = storage.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(creator.credits, 100);
    }
}
