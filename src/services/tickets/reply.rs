use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::create::MAX_BODY_CHARS;
use super::{TicketService, ensure_access, load_ticket};
use crate::models::{ApiResponse, ErrorCode, tickets::requests::CreateReplyRequest};
use crate::services::{ServiceResult, bad_request, current_user, error_response, finish, notifications};
use crate::utils::validate::validate_text;

pub async fn reply_ticket(
    service: &TicketService,
    request: &HttpRequest,
    ticket_id: i64,
    reply: CreateReplyRequest,
) -> ActixResult<HttpResponse> {
    finish(add_reply(service, request, ticket_id, reply).await)
}

async fn add_reply(
    service: &TicketService,
    request: &HttpRequest,
    ticket_id: i64,
    reply: CreateReplyRequest,
) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let body = reply.body.trim().to_string();
    validate_text("Reply", &body, MAX_BODY_CHARS)
        .map_err(|msg| bad_request(ErrorCode::TicketInvalid, msg))?;

    let ticket = load_ticket(storage.as_ref(), ticket_id).await?;
    ensure_access(&user, &ticket)?;
    if !ticket.status.accepts_replies() {
        return Err(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::TicketClosed,
            "Ticket is closed",
        )));
    }

    let is_staff = user.role.is_staff();
    let created = storage
        .add_ticket_reply(ticket_id, user.id, body.clone(), is_staff)
        .await
        .map_err(|e| error_response(&e))?;

    info!("User {} replied to ticket {}", user.id, ticket_id);

    // 教职人员回复他人工单时通知提交者
    if is_staff && ticket.user_id != user.id {
        match storage.get_user_by_id(ticket.user_id).await {
            Ok(Some(owner)) => {
                notifications::notify(request, notifications::ticket_reply(&owner, &ticket, &body))
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to load owner of ticket {}: {}", ticket_id, e),
        }
    }

    Ok(HttpResponse::Created().json(ApiResponse::success(created, "Reply added")))
}
