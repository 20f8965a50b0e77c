use super::entities::CreditKind;
use crate::models::common::{PaginationQuery, pagination::deserialize_optional_i64};
use serde::Deserialize;
use ts_rs::TS;

// 管理员发放积分
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct GrantCreditsRequest {
    pub user_id: i64,
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct TransactionListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub kind: Option<CreditKind>,
    /// 仅管理员可查看他人流水
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub user_id: Option<i64>,
}

// 流水导出参数
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/credit.ts")]
pub struct TransactionExportParams {
    pub kind: Option<CreditKind>,
    pub user_id: Option<i64>,
}

// 流水列表查询（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct TransactionListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub user_id: Option<i64>,
    pub kind: Option<CreditKind>,
}

/// 一次积分变动，`amount` 已带符号
#[derive(Debug, Clone)]
pub struct CreditChange {
    pub user_id: i64,
    pub amount: i64,
    pub kind: CreditKind,
    pub reason: String,
}
