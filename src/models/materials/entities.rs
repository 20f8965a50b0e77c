use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::define_string_enum! {
    pub enum MaterialType => "../frontend/src/types/generated/material.ts" {
        Notes = "notes",
        Flashcards = "flashcards",
        Quiz = "quiz",
    }
}

crate::define_string_enum! {
    pub enum MaterialStatus => "../frontend/src/types/generated/material.ts" {
        Generating = "generating",
        Ready = "ready",
        Failed = "failed",
    }
}

// 学习资料实体，content 为解析后的 JSON
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct StudyMaterial {
    pub id: i64,
    pub course_id: i64,
    pub material_type: MaterialType,
    pub chapter_index: i32,
    pub content: Option<serde_json::Value>,
    pub status: MaterialStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct NoteSection {
    pub heading: String,
    pub body: String,
}

/// 章节笔记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct ChapterNotes {
    pub sections: Vec<NoteSection>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct FlashcardDeck {
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

impl ChapterNotes {
    pub fn validate(&self) -> Result<(), String> {
        if self.sections.is_empty() {
            return Err("notes contain no sections".to_string());
        }
        Ok(())
    }
}

impl FlashcardDeck {
    pub fn validate(&self) -> Result<(), String> {
        if self.cards.is_empty() {
            return Err("flashcard deck is empty".to_string());
        }
        if self
            .cards
            .iter()
            .any(|c| c.front.trim().is_empty() || c.back.trim().is_empty())
        {
            return Err("flashcard with an empty side".to_string());
        }
        Ok(())
    }
}

impl Quiz {
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("quiz has no questions".to_string());
        }
        for (i, q) in self.questions.iter().enumerate() {
            if q.options.len() < 2 {
                return Err(format!("question {i} has fewer than two options"));
            }
            if q.answer_index >= q.options.len() {
                return Err(format!("question {i} answer index out of range"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_validation_checks_answer_index() {
        let mut quiz = Quiz {
            questions: vec![QuizQuestion {
                question: "2 + 2?".into(),
                options: vec!["3".into(), "4".into()],
                answer_index: 1,
                explanation: String::new(),
            }],
        };
        assert!(quiz.validate().is_ok());

        quiz.questions[0].answer_index = 2;
        assert!(quiz.validate().is_err());

        quiz.questions[0].options.truncate(1);
        quiz.questions[0].answer_index = 0;
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_flashcards_reject_blank_sides() {
        let deck = FlashcardDeck {
            cards: vec![Flashcard {
                front: "borrow".into(),
                back: " ".into(),
            }],
        };
        assert!(deck.validate().is_err());
        assert!(FlashcardDeck { cards: vec![] }.validate().is_err());
    }
}
