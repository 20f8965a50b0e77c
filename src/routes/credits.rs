use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::credits::requests::{
    GrantCreditsRequest, TransactionExportParams, TransactionListParams,
};
use crate::models::users::entities::UserRole;
use crate::services::CreditService;

static CREDIT_SERVICE: Lazy<CreditService> = Lazy::new(CreditService::new_lazy);

pub async fn get_balance(req: HttpRequest) -> ActixResult<HttpResponse> {
    CREDIT_SERVICE.get_balance(&req).await
}

pub async fn list_transactions(
    req: HttpRequest,
    query: web::Query<TransactionListParams>,
) -> ActixResult<HttpResponse> {
    CREDIT_SERVICE
        .list_transactions(&req, query.into_inner())
        .await
}

pub async fn export_transactions(
    req: HttpRequest,
    query: web::Query<TransactionExportParams>,
) -> ActixResult<HttpResponse> {
    CREDIT_SERVICE
        .export_transactions(&req, query.into_inner())
        .await
}

pub async fn grant_credits(
    req: HttpRequest,
    body: web::Json<GrantCreditsRequest>,
) -> ActixResult<HttpResponse> {
    CREDIT_SERVICE.grant(&req, body.into_inner()).await
}

pub fn configure_credits_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/credits")
            .wrap(RateLimit::api())
            .wrap(middlewares::RequireJWT)
            .route("", web::get().to(get_balance))
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions/export", web::get().to(export_transactions))
            .route(
                "/grant",
                web::post()
                    .to(grant_credits)
                    .wrap(middlewares::RequireRole::any(UserRole::admin_roles())),
            ),
    );
}
