use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::define_string_enum! {
    pub enum TicketStatus => "../frontend/src/types/generated/ticket.ts" {
        Open = "open",
        InProgress = "in_progress",
        Resolved = "resolved",
        Closed = "closed",
    }
}

impl TicketStatus {
    /// 已关闭的工单不再接受回复
    pub fn accepts_replies(&self) -> bool {
        !matches!(self, TicketStatus::Closed)
    }

    /// 回复后的状态：教职人员回复待处理工单转为处理中，用户回复已解决工单重新打开
    pub fn after_reply(self, is_staff: bool) -> TicketStatus {
        match (self, is_staff) {
            (TicketStatus::Open, true) => TicketStatus::InProgress,
            (TicketStatus::Resolved, false) => TicketStatus::Open,
            (status, _) => status,
        }
    }
}

crate::define_string_enum! {
    pub enum TicketCategory => "../frontend/src/types/generated/ticket.ts" {
        General = "general",
        Billing = "billing",
        Technical = "technical",
        Content = "content",
    }
}

crate::define_string_enum! {
    pub enum TicketPriority => "../frontend/src/types/generated/ticket.ts" {
        Low = "low",
        Normal = "normal",
        High = "high",
        Urgent = "urgent",
    }
}

impl Default for TicketCategory {
    fn default() -> Self {
        TicketCategory::General
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        TicketPriority::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct SupportTicket {
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct TicketReply {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub body: String,
    pub is_staff: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_transitions() {
        assert_eq!(TicketStatus::Open.after_reply(true), TicketStatus::InProgress);
        assert_eq!(TicketStatus::Open.after_reply(false), TicketStatus::Open);
        assert_eq!(TicketStatus::Resolved.after_reply(false), TicketStatus::Open);
        assert_eq!(TicketStatus::Resolved.after_reply(true), TicketStatus::Resolved);
        assert_eq!(TicketStatus::InProgress.after_reply(false), TicketStatus::InProgress);
    }

    #[test]
    fn test_closed_tickets_reject_replies() {
        assert!(!TicketStatus::Closed.accepts_replies());
        assert!(TicketStatus::Resolved.accepts_replies());
    }
}
