use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::integrations::{ExternalError, LlmClient, generate_json, prompts};
use crate::models::courses::entities::{ChapterOutline, Course};
use crate::models::materials::entities::{
    ChapterNotes, FlashcardDeck, MaterialStatus, MaterialType, Quiz,
};

use super::GenerationContext;

async fn generate_validated<T>(
    llm: &dyn LlmClient,
    (system, prompt): (String, String),
    validate: impl FnOnce(&T) -> Result<(), String>,
) -> Result<serde_json::Value, ExternalError>
where
    T: DeserializeOwned + Serialize,
{
    let parsed: T = generate_json(llm, &system, &prompt).await?;
    validate(&parsed).map_err(ExternalError::MalformedResponse)?;
    serde_json::to_value(&parsed).map_err(|e| ExternalError::MalformedResponse(e.to_string()))
}

/// 为单个章节生成一份资料，结构不合法时视为 `MalformedResponse`
pub async fn generate_material_content(
    llm: &dyn LlmClient,
    course: &Course,
    chapter: &ChapterOutline,
    material_type: MaterialType,
) -> Result<serde_json::Value, ExternalError> {
    match material_type {
        MaterialType::Notes => {
            generate_validated::<ChapterNotes>(
                llm,
                prompts::chapter_notes(course, chapter),
                ChapterNotes::validate,
            )
            .await
        }
        MaterialType::Flashcards => {
            generate_validated::<FlashcardDeck>(
                llm,
                prompts::flashcards(course, chapter),
                FlashcardDeck::validate,
            )
            .await
        }
        MaterialType::Quiz => {
            generate_validated::<Quiz>(llm, prompts::quiz(course, chapter), Quiz::validate).await
        }
    }
}

/// 生成并保存一份资料，返回最终状态
pub(crate) async fn run_material_generation(
    ctx: &GenerationContext,
    course: &Course,
    material_type: MaterialType,
    chapter_index: i32,
) -> MaterialStatus {
    let result = match course.layout.as_ref().and_then(|l| l.chapter(chapter_index)) {
        Some(chapter) => {
            generate_material_content(ctx.llm.as_ref(), course, chapter, material_type).await
        }
        None => Err(ExternalError::MalformedResponse(format!(
            "course {} has no chapter {}",
            course.id, chapter_index
        ))),
    };

    let (status, content) = match result {
        Ok(content) => (MaterialStatus::Ready, Some(content)),
        Err(e) => {
            tracing::error!(
                course_id = course.id,
                chapter = chapter_index,
                material = %material_type,
                "Material generation failed: {e}"
            );
            (MaterialStatus::Failed, None)
        }
    };

    if let Err(e) = ctx
        .storage
        .upsert_material(course.id, material_type, chapter_index, status, content)
        .await
    {
        tracing::error!(
            "Failed to save {} for course {} chapter {}: {}",
            material_type,
            course.id,
            chapter_index,
            e
        );
        return MaterialStatus::Failed;
    }
    status
}

/// 生成一份已扣费的资料，失败时退还 `charged` 积分
pub(crate) async fn run_charged_material_generation(
    ctx: &GenerationContext,
    course: &Course,
    user_id: i64,
    material_type: MaterialType,
    chapter_index: i32,
    charged: i64,
) -> MaterialStatus {
    let status = run_material_generation(ctx, course, material_type, chapter_index).await;
    if status == MaterialStatus::Failed {
        ctx.refund(
            user_id,
            charged,
            format!(
                "refund: {} for course #{} chapter {} failed",
                material_type, course.id, chapter_index
            ),
        )
        .await;
    }
    status
}

pub fn spawn_material_generation(
    ctx: GenerationContext,
    course: Course,
    user_id: i64,
    material_type: MaterialType,
    chapter_index: i32,
    charged: i64,
) {
    tokio::spawn(async move {
        run_charged_material_generation(&ctx, &course, user_id, material_type, chapter_index, charged)
            .await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::{CourseStatus, CourseType, Difficulty};
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

    fn course() -> Course {
        Course {
            id: 1,
            creator_id: 1,
            topic: "Rust".into(),
            title: Some("Rust Basics".into()),
            course_type: CourseType::Standard,
            difficulty: Difficulty::Easy,
            layout: None,
            status: CourseStatus::Ready,
            chapter_count: 1,
            requested_chapters: 1,
            credits_charged: 20,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn chapter() -> ChapterOutline {
        ChapterOutline {
            title: "Ownership".into(),
            summary: "Moves and borrows".into(),
            topics: vec!["move".into()],
        }
    }

    #[tokio::test]
    async fn test_quiz_content_is_validated() {
        let llm = CannedLlm(
            r#"{"questions":[{"question":"Who owns x?","options":["a","b"],"answer_index":1}]}"#,
        );
        let value = generate_material_content(&llm, &course(), &chapter(), MaterialType::Quiz)
            .await
            .unwrap();
        assert_eq!(value["questions"][0]["answer_index"], 1);
        assert_eq!(value["questions"][0]["explanation"], "");
    }

    #[tokio::test]
    async fn test_invalid_structure_is_malformed() {
        let llm = CannedLlm(r#"{"cards":[]}"#);
        let err = generate_material_content(&llm, &course(), &chapter(), MaterialType::Flashcards)
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_notes_from_fenced_output() {
        let llm = CannedLlm(
            "```json\n{\"sections\":[{\"heading\":\"Moves\",\"body\":\"...\"}],\"key_points\":[\"one owner\"]}\n```",
        );
        let value = generate_material_content(&llm, &course(), &chapter(), MaterialType::Notes)
            .await
            .unwrap();
        assert_eq!(value["key_points"][0], "one owner");
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
    async fn test_failed_material_refunds_charge() {
        use crate::models::courses::entities::CourseLayout;
        use crate::models::credits::{entities::CreditKind, requests::CreditChange};
        use crate::storage::Storage;
        use crate::storage::sea_orm_storage::fixtures::{seed_course, storage_with_user};
        use std::sync::Arc;

        let (storage, user) = storage_with_user(50).await;
        let seeded = seed_course(&storage, user.id, 0).await;
        let layout = CourseLayout {
            title: "Rust Basics".into(),
            summary: String::new(),
            chapters: vec![chapter()],
        };
        let course = storage
            .save_course_layout(seeded.id, &layout)
            .await
            .unwrap()
            .unwrap();
        storage
            .apply_credit_change(CreditChange {
                user_id: user.id,
                amount: -5,
                kind: CreditKind::Deduction,
                reason: "quiz".into(),
            })
            .await
            .unwrap();

        let storage: Arc<dyn Storage> = Arc::new(storage);
        let ctx = GenerationContext {
            storage: storage.clone(),
            llm: Arc::new(DownLlm),
            mailer: None,
            cache: None,
            notes_on_create: false,
        };

        let status =
            run_charged_material_generation(&ctx, &course, user.id, MaterialType::Quiz, 0, 5).await;
        assert_eq!(status, MaterialStatus::Failed);

        let material = storage
            .get_material(course.id, MaterialType::Quiz, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(material.status, MaterialStatus::Failed);

        let refunds = storage
            .list_credit_transactions(Some(user.id), Some(CreditKind::Refund))
            .await
            .unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, 5);
        assert_eq!(refunds[0].balance_after, 50);
    }
}
