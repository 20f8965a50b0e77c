use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::TicketService;
use crate::models::{
    ApiResponse,
    tickets::requests::{TicketListParams, TicketListQuery},
};
use crate::services::{ServiceResult, current_user, error_response, finish};

pub async fn list_tickets(
    service: &TicketService,
    request: &HttpRequest,
    params: TicketListParams,
) -> ActixResult<HttpResponse> {
    finish(list(service, request, params).await)
}

async fn list(service: &TicketService, request: &HttpRequest, params: TicketListParams) -> ServiceResult {
    let user = current_user(request)?;
    let storage = service.get_storage(request)?;

    let user_id = (!user.role.is_staff()).then_some(user.id);
    let page = storage
        .list_tickets_with_pagination(TicketListQuery {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            user_id,
            status: params.status,
        })
        .await
        .map_err(|e| error_response(&e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(page, "Tickets retrieved")))
}
