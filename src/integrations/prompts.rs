//! 生成与评分使用的提示词
//!
//! 每个函数返回 `(system, user)` 两段内容，输出格式都要求为单个 JSON 对象。

use crate::models::courses::entities::{ChapterOutline, Course, CourseType, Difficulty};

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else. Do not wrap it in prose.";

fn course_style(course_type: CourseType) -> &'static str {
    match course_type {
        CourseType::Standard => "a well-paced course that builds understanding step by step",
        CourseType::CrashCourse => "a compact crash course focused on the essentials",
        CourseType::ExamPrep => "an exam preparation course emphasising practice and recall",
    }
}

fn audience(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "complete beginners",
        Difficulty::Moderate => "learners with some background knowledge",
        Difficulty::Hard => "advanced learners who want depth and rigour",
    }
}

pub fn course_layout(
    topic: &str,
    course_type: CourseType,
    difficulty: Difficulty,
    chapters: i32,
) -> (String, String) {
    let system = format!(
        "You are an experienced curriculum designer. {JSON_ONLY} The JSON must have the shape \
         {{\"title\": string, \"summary\": string, \"chapters\": [{{\"title\": string, \"summary\": string, \"topics\": [string]}}]}}."
    );
    let user = format!(
        "Design {} about \"{topic}\" for {}. Use exactly {chapters} chapters, ordered from \
         foundations to advanced material.",
        course_style(course_type),
        audience(difficulty),
    );
    (system, user)
}

fn chapter_context(course: &Course, chapter: &ChapterOutline) -> String {
    let title = course.title.as_deref().unwrap_or(&course.topic);
    let topics = if chapter.topics.is_empty() {
        String::from("(none listed)")
    } else {
        chapter.topics.join(", ")
    };
    format!(
        "Course: {title}\nAudience: {}\nChapter: {}\nChapter summary: {}\nTopics: {topics}",
        audience(course.difficulty),
        chapter.title,
        chapter.summary,
    )
}

pub fn chapter_notes(course: &Course, chapter: &ChapterOutline) -> (String, String) {
    let system = format!(
        "You write clear, accurate study notes. {JSON_ONLY} The JSON must have the shape \
         {{\"sections\": [{{\"heading\": string, \"body\": string}}], \"key_points\": [string]}}."
    );
    let user = format!(
        "{}\n\nWrite study notes for this chapter in 3 to 6 sections, then list the key points.",
        chapter_context(course, chapter)
    );
    (system, user)
}

pub fn flashcards(course: &Course, chapter: &ChapterOutline) -> (String, String) {
    let system = format!(
        "You create spaced-repetition flashcards. {JSON_ONLY} The JSON must have the shape \
         {{\"cards\": [{{\"front\": string, \"back\": string}}]}}."
    );
    let user = format!(
        "{}\n\nCreate 8 to 12 flashcards. Keep each side short and unambiguous.",
        chapter_context(course, chapter)
    );
    (system, user)
}

pub fn quiz(course: &Course, chapter: &ChapterOutline) -> (String, String) {
    let system = format!(
        "You write multiple-choice assessments. {JSON_ONLY} The JSON must have the shape \
         {{\"questions\": [{{\"question\": string, \"options\": [string], \"answer_index\": number, \"explanation\": string}}]}}. \
         answer_index is the zero-based index of the correct option."
    );
    let user = format!(
        "{}\n\nWrite 5 questions with 4 options each.",
        chapter_context(course, chapter)
    );
    (system, user)
}

pub fn grade_answer(course: &Course, chapter: Option<&ChapterOutline>, question: &str, answer: &str) -> (String, String) {
    let system = format!(
        "You are a fair and encouraging grader. {JSON_ONLY} The JSON must have the shape \
         {{\"score\": number, \"feedback\": string}} where score is between 0 and 100."
    );
    let context = match chapter {
        Some(ch) => chapter_context(course, ch),
        None => format!("Course: {}", course.title.as_deref().unwrap_or(&course.topic)),
    };
    let user = format!(
        "{context}\n\nQuestion:\n{question}\n\nStudent answer:\n{answer}\n\n\
         Grade the answer for correctness and completeness, and give two or three sentences of feedback."
    );
    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::CourseStatus;

    fn course() -> Course {
        let now = chrono::Utc::now();
        Course {
            id: 1,
            creator_id: 1,
            topic: "Photosynthesis".into(),
            title: Some("How Plants Eat Light".into()),
            course_type: CourseType::ExamPrep,
            difficulty: Difficulty::Easy,
            layout: None,
            status: CourseStatus::Ready,
            chapter_count: 1,
            requested_chapters: 1,
            credits_charged: 20,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_layout_prompt_mentions_topic_and_chapter_count() {
        let (system, user) = course_layout("Photosynthesis", CourseType::Standard, Difficulty::Hard, 7);
        assert!(system.contains("\"chapters\""));
        assert!(user.contains("Photosynthesis"));
        assert!(user.contains("exactly 7 chapters"));
        assert!(user.contains("advanced learners"));
    }

    #[test]
    fn test_grading_prompt_includes_answer() {
        let chapter = ChapterOutline {
            title: "Light reactions".into(),
            summary: String::new(),
            topics: vec!["chlorophyll".into()],
        };
        let (_, user) = grade_answer(&course(), Some(&chapter), "What absorbs light?", "Chlorophyll");
        assert!(user.contains("Light reactions"));
        assert!(user.contains("Chlorophyll"));
        assert!(user.contains("How Plants Eat Light"));
    }
}
