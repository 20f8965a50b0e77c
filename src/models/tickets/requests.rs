use super::entities::{TicketCategory, TicketPriority, TicketStatus};
use crate::models::common::PaginationQuery;
use serde::Deserialize;
use ts_rs::TS;

// 创建工单，message 作为首条回复保存
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct CreateTicketRequest {
    pub subject: String,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    pub message: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct CreateReplyRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct UpdateTicketStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct TicketListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub status: Option<TicketStatus>,
}

// 工单列表查询（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct TicketListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// 为空时列出全部工单（教职人员）
    pub user_id: Option<i64>,
    pub status: Option<TicketStatus>,
}
