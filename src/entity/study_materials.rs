//! 学习资料实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "study_materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub material_type: String,
    pub chapter_index: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Course,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_material(self) -> crate::models::materials::entities::StudyMaterial {
        use super::timestamp_to_datetime;
        use crate::models::materials::entities::{MaterialStatus, MaterialType, StudyMaterial};

        StudyMaterial {
            id: self.id,
            course_id: self.course_id,
            material_type: self
                .material_type
                .parse::<MaterialType>()
                .unwrap_or(MaterialType::Notes),
            chapter_index: self.chapter_index,
            content: self
                .content
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            status: self
                .status
                .parse::<MaterialStatus>()
                .unwrap_or(MaterialStatus::Failed),
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}
