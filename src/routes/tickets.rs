use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::tickets::requests::{
    CreateReplyRequest, CreateTicketRequest, TicketListParams, UpdateTicketStatusRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::TicketService;
use crate::utils::SafeTicketIdI64;

// 懒加载的全局 TICKET_SERVICE 实例
static TICKET_SERVICE: Lazy<TicketService> = Lazy::new(TicketService::new_lazy);

pub async fn list_tickets(
    req: HttpRequest,
    query: web::Query<TicketListParams>,
) -> ActixResult<HttpResponse> {
    TICKET_SERVICE.list_tickets(&req, query.into_inner()).await
}

pub async fn create_ticket(
    req: HttpRequest,
    body: web::Json<CreateTicketRequest>,
) -> ActixResult<HttpResponse> {
    TICKET_SERVICE.create_ticket(&req, body.into_inner()).await
}

pub async fn get_ticket(req: HttpRequest, ticket_id: SafeTicketIdI64) -> ActixResult<HttpResponse> {
    TICKET_SERVICE.get_ticket(&req, ticket_id.0).await
}

pub async fn reply_ticket(
    req: HttpRequest,
    ticket_id: SafeTicketIdI64,
    body: web::Json<CreateReplyRequest>,
) -> ActixResult<HttpResponse> {
    TICKET_SERVICE
        .reply_ticket(&req, ticket_id.0, body.into_inner())
        .await
}

pub async fn update_ticket_status(
    req: HttpRequest,
    ticket_id: SafeTicketIdI64,
    body: web::Json<UpdateTicketStatusRequest>,
) -> ActixResult<HttpResponse> {
    TICKET_SERVICE
        .update_status(&req, ticket_id.0, body.into_inner())
        .await
}

pub fn configure_tickets_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/tickets")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_tickets))
                    .route(web::post().to(create_ticket)),
            )
            .route("/{ticket_id}", web::get().to(get_ticket))
            .route("/{ticket_id}/replies", web::post().to(reply_ticket))
            .route(
                "/{ticket_id}/status",
                web::put()
                    .to(update_ticket_status)
                    // 仅教职人员可以修改工单状态
                    .wrap(middlewares::RequireRole::any(UserRole::staff_roles())),
            ),
    );
}
