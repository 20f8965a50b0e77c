use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::define_string_enum! {
    /// 课程生成状态，前端轮询该字段
    pub enum CourseStatus => "../frontend/src/types/generated/course.ts" {
        Generating = "generating",
        Ready = "ready",
        Failed = "failed",
    }
}

crate::define_string_enum! {
    pub enum CourseType => "../frontend/src/types/generated/course.ts" {
        Standard = "standard",
        CrashCourse = "crash_course",
        ExamPrep = "exam_prep",
    }
}

crate::define_string_enum! {
    pub enum Difficulty => "../frontend/src/types/generated/course.ts" {
        Easy = "easy",
        Moderate = "moderate",
        Hard = "hard",
    }
}

impl Default for CourseType {
    fn default() -> Self {
        CourseType::Standard
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Moderate
    }
}

/// 单个章节大纲
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct ChapterOutline {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// 由模型生成的课程结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseLayout {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub chapters: Vec<ChapterOutline>,
}

impl CourseLayout {
    /// 校验生成结果的基本结构
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("course layout has an empty title".to_string());
        }
        if self.chapters.is_empty() {
            return Err("course layout has no chapters".to_string());
        }
        if let Some(idx) = self.chapters.iter().position(|c| c.title.trim().is_empty()) {
            return Err(format!("chapter {idx} has an empty title"));
        }
        Ok(())
    }

    pub fn chapter(&self, index: i32) -> Option<&ChapterOutline> {
        usize::try_from(index).ok().and_then(|i| self.chapters.get(i))
    }
}

// 课程实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct Course {
    pub id: i64,
    pub creator_id: i64,
    pub topic: String,
    pub title: Option<String>,
    pub course_type: CourseType,
    pub difficulty: Difficulty,
    pub layout: Option<CourseLayout>,
    pub status: CourseStatus,
    /// 实际章节数，大纲生成后以大纲为准
    pub chapter_count: i32,
    /// 创建时请求的章节数，重新生成时沿用
    pub requested_chapters: i32,
    pub credits_charged: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Course {
    pub fn is_ready(&self) -> bool {
        self.status == CourseStatus::Ready
    }

    pub fn has_chapter(&self, index: i32) -> bool {
        index >= 0 && index < self.chapter_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(chapters: &[&str]) -> CourseLayout {
        CourseLayout {
            title: "Rust".into(),
            summary: String::new(),
            chapters: chapters
                .iter()
                .map(|t| ChapterOutline {
                    title: t.to_string(),
                    summary: String::new(),
                    topics: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_layout_validation() {
        assert!(layout(&["Ownership", "Borrowing"]).validate().is_ok());
        assert!(layout(&[]).validate().is_err());
        assert!(layout(&["Ownership", "  "]).validate().is_err());
    }

    #[test]
    fn test_layout_parses_with_missing_optional_fields() {
        let json = r#"{"title":"Go","chapters":[{"title":"Intro"}]}"#;
        let parsed: CourseLayout = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.chapters.len(), 1);
        assert!(parsed.chapter(0).is_some());
        assert!(parsed.chapter(-1).is_none());
        assert!(parsed.chapter(1).is_none());
    }
}
