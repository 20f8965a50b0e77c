//! 学习进度实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    /// JSON 整数数组
    #[sea_orm(column_type = "Text")]
    pub completed_chapters: String,
    pub percent: i32,
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
    pub fn into_progress(self) -> crate::models::progress::entities::Progress {
        crate::models::progress::entities::Progress {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            completed_chapters: serde_json::from_str(&self.completed_chapters).unwrap_or_default(),
            percent: self.percent,
            updated_at: super::timestamp_to_datetime(self.updated_at),
        }
    }
}
