use super::entities::{SupportTicket, TicketReply};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/ticket.ts")]
pub struct TicketDetailResponse {
    pub ticket: SupportTicket,
    pub replies: Vec<TicketReply>,
}
