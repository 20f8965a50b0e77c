//! 积分流水实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "credit_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub balance_after: i64,
    pub kind: String,
    pub reason: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_transaction(self) -> crate::models::credits::entities::CreditTransaction {
        use crate::models::credits::entities::{CreditKind, CreditTransaction};

        let kind = self.kind.parse::<CreditKind>().unwrap_or(if self.amount < 0 {
            CreditKind::Deduction
        } else {
            CreditKind::Grant
        });

        CreditTransaction {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            balance_after: self.balance_after,
            kind,
            reason: self.reason,
            created_at: super::timestamp_to_datetime(self.created_at),
        }
    }
}
