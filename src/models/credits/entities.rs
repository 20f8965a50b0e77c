use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::define_string_enum! {
    /// 积分流水类型
    pub enum CreditKind => "../frontend/src/types/generated/credit.ts" {
        Grant = "grant",
        Purchase = "purchase",
        Deduction = "deduction",
        Refund = "refund",
    }
}

impl CreditKind {
    /// 该类型流水金额应有的符号
    pub fn is_debit(&self) -> bool {
        matches!(self, CreditKind::Deduction)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct CreditTransaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub balance_after: i64,
    pub kind: CreditKind,
    pub reason: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
