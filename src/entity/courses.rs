//! 课程实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub creator_id: i64,
    pub topic: String,
    pub title: Option<String>,
    pub course_type: String,
    pub difficulty: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub layout: Option<String>,
    pub status: String,
    pub chapter_count: i32,
    pub requested_chapters: i32,
    pub credits_charged: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::study_materials::Entity")]
    StudyMaterials,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::study_materials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 布局 JSON 解析失败时按无布局处理
    pub fn into_course(self) -> crate::models::courses::entities::Course {
        use super::timestamp_to_datetime;
        use crate::models::courses::entities::{
            Course, CourseLayout, CourseStatus, CourseType, Difficulty,
        };

        let layout = self
            .layout
            .as_deref()
            .and_then(|raw| match serde_json::from_str::<CourseLayout>(raw) {
                Ok(layout) => Some(layout),
                Err(e) => {
                    tracing::warn!(course_id = self.id, "Stored course layout is invalid: {e}");
                    None
                }
            });

        Course {
            id: self.id,
            creator_id: self.creator_id,
            topic: self.topic,
            title: self.title,
            course_type: self
                .course_type
                .parse::<CourseType>()
                .unwrap_or_default(),
            difficulty: self.difficulty.parse::<Difficulty>().unwrap_or_default(),
            layout,
            status: self
                .status
                .parse::<CourseStatus>()
                .unwrap_or(CourseStatus::Failed),
            chapter_count: self.chapter_count,
            requested_chapters: self.requested_chapters,
            credits_charged: self.credits_charged,
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}
