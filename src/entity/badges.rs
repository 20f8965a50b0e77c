//! 徽章实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "badges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub badge_key: String,
    pub awarded_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 未知的徽章标识返回 None
    pub fn into_badge(self) -> Option<crate::models::progress::entities::Badge> {
        use crate::models::progress::entities::{Badge, BadgeKey};

        let badge_key = self.badge_key.parse::<BadgeKey>().ok()?;
        Some(Badge {
            id: self.id,
            user_id: self.user_id,
            badge_key,
            awarded_at: super::timestamp_to_datetime(self.awarded_at),
        })
    }
}
