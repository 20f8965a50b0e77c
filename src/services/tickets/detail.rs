use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{TicketService, ensure_access, load_ticket};
use crate::models::{ApiResponse, tickets::responses::TicketDetailResponse};
use crate::services::{ServiceResult, current_user, error_response, finish};

pub async fn get_ticket(
    service: &TicketService,
    request: &HttpRequest,
    ticket_id: i64,
) -> ActixResult<HttpResponse> {
    finish(detail(service, request, ticket_id).await)
}

async fn detail(service: &TicketService, request: &HttpRequest, ticket_id: i64) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let ticket = load_ticket(storage.as_ref(), ticket_id).await?;
    ensure_access(&user, &ticket)?;

    let replies = storage
        .list_ticket_replies(ticket_id)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        TicketDetailResponse { ticket, replies },
        "Ticket retrieved",
    )))
}
