use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::define_string_enum! {
    pub enum SubmissionStatus => "../frontend/src/types/generated/submission.ts" {
        Pending = "pending",
        Graded = "graded",
        Failed = "failed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct Submission {
    pub id: i64,
    pub course_id: i64,
    pub user_id: i64,
    pub chapter_index: i32,
    pub question: String,
    pub answer: String,
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 模型返回的评分结果
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradingResult {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

impl GradingResult {
    /// 将分数收敛到 0..=100；非有限数视为无效输出
    pub fn normalized_score(&self) -> Option<i32> {
        if !self.score.is_finite() {
            return None;
        }
        Some(self.score.round().clamp(0.0, 100.0) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64) -> GradingResult {
        GradingResult {
            score,
            feedback: String::new(),
        }
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(result(120.0).normalized_score(), Some(100));
        assert_eq!(result(-5.0).normalized_score(), Some(0));
        assert_eq!(result(87.6).normalized_score(), Some(88));
    }

    #[test]
    fn test_non_finite_score_rejected() {
        assert_eq!(result(f64::NAN).normalized_score(), None);
        assert_eq!(result(f64::INFINITY).normalized_score(), None);
    }
}
