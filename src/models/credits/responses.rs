use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct CreditBalanceResponse {
    pub balance: i64,
    pub low_balance: bool,
    pub course_cost: i64,
    pub material_cost: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct GrantCreditsResponse {
    pub user_id: i64,
    pub balance: i64,
}
