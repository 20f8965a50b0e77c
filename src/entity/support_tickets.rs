//! 工单实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "support_tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_replies::Entity")]
    Replies,
}

impl Related<super::ticket_replies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Replies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_ticket(self) -> crate::models::tickets::entities::SupportTicket {
        use super::timestamp_to_datetime;
        use crate::models::tickets::entities::{SupportTicket, TicketStatus};

        SupportTicket {
            id: self.id,
            user_id: self.user_id,
            subject: self.subject,
            category: self.category.parse().unwrap_or_default(),
            priority: self.priority.parse().unwrap_or_default(),
            status: self
                .status
                .parse::<TicketStatus>()
                .unwrap_or(TicketStatus::Open),
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}
