use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::TicketService;
use crate::models::{ApiResponse, ErrorCode, tickets::requests::UpdateTicketStatusRequest};
use crate::services::{ServiceResult, current_user, error_response, finish, not_found, notifications};

pub async fn update_status(
    service: &TicketService,
    request: &HttpRequest,
    ticket_id: i64,
    update: UpdateTicketStatusRequest,
) -> ActixResult<HttpResponse> {
    finish(change_status(service, request, ticket_id, update).await)
}

async fn change_status(
    service: &TicketService,
    request: &HttpRequest,
    ticket_id: i64,
    update: UpdateTicketStatusRequest,
) -> ServiceResult {
    let staff = current_user(request)?;
    let storage = service.get_storage(request)?;

    let previous = storage
        .get_ticket_by_id(ticket_id)
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| not_found(ErrorCode::TicketNotFound, "Ticket not found"))?;

    if previous.status == update.status {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(previous, "Ticket status unchanged")));
    }

    let ticket = storage
        .update_ticket_status(ticket_id, update.status)
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| not_found(ErrorCode::TicketNotFound, "Ticket not found"))?;

    info!(
        "Ticket {} moved from {} to {} by user {}",
        ticket_id, previous.status, ticket.status, staff.id
    );

    match storage.get_user_by_id(ticket.user_id).await {
        Ok(Some(owner)) => notifications::notify(request, notifications::ticket_status(&owner, &ticket)),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load owner of ticket {}: {}", ticket_id, e),
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(ticket, "Ticket status updated")))
}
