pub mod create;
pub mod detail;
pub mod list;
pub mod reply;
pub mod status;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{
    ErrorCode,
    tickets::{
        entities::SupportTicket,
        requests::{CreateReplyRequest, CreateTicketRequest, TicketListParams, UpdateTicketStatusRequest},
    },
    users::entities::User,
};
use crate::storage::Storage;

use super::{app_data, error_response, forbidden, not_found};

pub struct TicketService {
    storage: Option<Arc<dyn Storage>>,
}

impl TicketService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    pub async fn create_ticket(
        &self,
        request: &HttpRequest,
        ticket: CreateTicketRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_ticket(self, request, ticket).await
    }

    // 用户看到自己的工单，教职人员看到全部
    pub async fn list_tickets(
        &self,
        request: &HttpRequest,
        params: TicketListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_tickets(self, request, params).await
    }

    pub async fn get_ticket(&self, request: &HttpRequest, ticket_id: i64) -> ActixResult<HttpResponse> {
        detail::get_ticket(self, request, ticket_id).await
    }

    pub async fn reply_ticket(
        &self,
        request: &HttpRequest,
        ticket_id: i64,
        reply: CreateReplyRequest,
    ) -> ActixResult<HttpResponse> {
        reply::reply_ticket(self, request, ticket_id, reply).await
    }

    pub async fn update_status(
        &self,
        request: &HttpRequest,
        ticket_id: i64,
        update: UpdateTicketStatusRequest,
    ) -> ActixResult<HttpResponse> {
        status::update_status(self, request, ticket_id, update).await
    }
}

pub(crate) async fn load_ticket(storage: &dyn Storage, ticket_id: i64) -> Result<SupportTicket, HttpResponse> {
    storage
        .get_ticket_by_id(ticket_id)
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| not_found(ErrorCode::TicketNotFound, "Ticket not found"))
}

/// 工单提交者与教职人员可以访问
pub(crate) fn ensure_access(user: &User, ticket: &SupportTicket) -> Result<(), HttpResponse> {
    if ticket.user_id == user.id || user.role.is_staff() {
        Ok(())
    } else {
        Err(forbidden(
            ErrorCode::TicketPermissionDenied,
            "You do not have access to this ticket",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tickets::entities::{TicketCategory, TicketPriority, TicketStatus};
    use crate::models::users::entities::{UserRole, UserStatus};

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            username: format!("user_{id}"),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            display_name: None,
            credits: 0,
            last_login: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_ticket_access() {
        let ticket = SupportTicket {
            id: 1,
            user_id: 5,
            subject: "Refund".into(),
            category: TicketCategory::Billing,
            priority: TicketPriority::Normal,
            status: TicketStatus::Open,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert!(ensure_access(&user(5, UserRole::User), &ticket).is_ok());
        assert!(ensure_access(&user(6, UserRole::User), &ticket).is_err());
        assert!(ensure_access(&user(7, UserRole::Teacher), &ticket).is_ok());
        assert!(ensure_access(&user(8, UserRole::Admin), &ticket).is_ok());
    }
}
