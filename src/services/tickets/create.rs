use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::TicketService;
use crate::models::{ApiResponse, ErrorCode, tickets::requests::CreateTicketRequest};
use crate::services::{ServiceResult, bad_request, current_user, error_response, finish};
use crate::utils::validate::validate_text;

const MAX_SUBJECT_CHARS: usize = 200;
pub(crate) const MAX_BODY_CHARS: usize = 5000;

pub async fn create_ticket(
    service: &TicketService,
    request: &HttpRequest,
    ticket: CreateTicketRequest,
) -> ActixResult<HttpResponse> {
    finish(create(service, request, ticket).await)
}

async fn create(service: &TicketService, request: &HttpRequest, mut ticket: CreateTicketRequest) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    ticket.subject = ticket.subject.trim().to_string();
    ticket.message = ticket.message.trim().to_string();
    validate_text("Subject", &ticket.subject, MAX_SUBJECT_CHARS)
        .map_err(|msg| bad_request(ErrorCode::TicketInvalid, msg))?;
    validate_text("Message", &ticket.message, MAX_BODY_CHARS)
        .map_err(|msg| bad_request(ErrorCode::TicketInvalid, msg))?;

    let created = storage
        .create_ticket(user.id, user.role.is_staff(), ticket)
        .await
        .map_err(|e| error_response(&e))?;

    info!("User {} opened ticket {}", user.id, created.id);
    Ok(HttpResponse::Created().json(ApiResponse::success(created, "Ticket created")))
}
