use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 学习进度
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub completed_chapters: Vec<i32>,
    pub percent: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// 根据已完成章节计算百分比，结果落在 0..=100
///
/// 章节编号去重，越界编号不计入。
pub fn compute_percent(completed: &[i32], chapter_count: i32) -> i32 {
    if chapter_count <= 0 {
        return 0;
    }
    let mut valid: Vec<i32> = completed
        .iter()
        .copied()
        .filter(|c| *c >= 0 && *c < chapter_count)
        .collect();
    valid.sort_unstable();
    valid.dedup();
    let percent = (valid.len() as i64 * 100) / chapter_count as i64;
    percent.clamp(0, 100) as i32
}

crate::define_string_enum! {
    /// 徽章标识
    pub enum BadgeKey => "../frontend/src/types/generated/progress.ts" {
        FirstCourse = "first_course",
        FirstCompletion = "first_completion",
        ThreeCompletions = "three_completions",
        PerfectQuiz = "perfect_quiz",
    }
}

impl BadgeKey {
    pub fn title(&self) -> &'static str {
        match self {
            BadgeKey::FirstCourse => "First Steps",
            BadgeKey::FirstCompletion => "Finisher",
            BadgeKey::ThreeCompletions => "Dedicated Learner",
            BadgeKey::PerfectQuiz => "Perfect Score",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct Badge {
    pub id: i64,
    pub user_id: i64,
    pub badge_key: BadgeKey,
    pub awarded_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_ignores_duplicates_and_out_of_range() {
        assert_eq!(compute_percent(&[0, 1, 1, 7, -1], 4), 50);
        assert_eq!(compute_percent(&[0, 1, 2, 3], 4), 100);
        assert_eq!(compute_percent(&[], 4), 0);
    }

    #[test]
    fn test_percent_with_no_chapters() {
        assert_eq!(compute_percent(&[0, 1], 0), 0);
    }

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(compute_percent(&[0], 3), 33);
    }
}
