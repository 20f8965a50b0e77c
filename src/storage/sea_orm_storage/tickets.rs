use super::{SeaOrmStorage, page_params};
use crate::entity::support_tickets::{ActiveModel, Column, Entity as SupportTickets};
use crate::entity::ticket_replies::{
    ActiveModel as ReplyActiveModel, Column as ReplyColumn, Entity as TicketReplies,
};
use crate::errors::{LearnHubError, Result};
use crate::models::{
    PaginatedResponse, PaginationInfo,
    tickets::{
        entities::{SupportTicket, TicketReply, TicketStatus},
        requests::{CreateTicketRequest, TicketListQuery},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建工单，首条消息作为第一条回复在同一事务内写入
    pub async fn create_ticket_impl(
        &self,
        user_id: i64,
        is_staff: bool,
        req: CreateTicketRequest,
    ) -> Result<SupportTicket> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("开启事务失败: {e}")))?;

        let ticket = ActiveModel {
            user_id: Set(user_id),
            subject: Set(req.subject),
            category: Set(req.category.to_string()),
            priority: Set(req.priority.to_string()),
            status: Set(TicketStatus::Open.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| LearnHubError::database_operation(format!("创建工单失败: {e}")))?;

        ReplyActiveModel {
            ticket_id: Set(ticket.id),
            author_id: Set(user_id),
            body: Set(req.message),
            is_staff: Set(is_staff),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| LearnHubError::database_operation(format!("创建工单回复失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(ticket.into_ticket())
    }

    pub async fn get_ticket_by_id_impl(&self, ticket_id: i64) -> Result<Option<SupportTicket>> {
        let result = SupportTickets::find_by_id(ticket_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单失败: {e}")))?;

        Ok(result.map(|m| m.into_ticket()))
    }

    /// 分页列出工单，最近更新的在前
    pub async fn list_tickets_with_pagination_impl(
        &self,
        query: TicketListQuery,
    ) -> Result<PaginatedResponse<SupportTicket>> {
        let (page, size) = page_params(query.page, query.size);

        let mut select = SupportTickets::find();

        if let Some(user_id) = query.user_id {
            select = select.filter(Column::UserId.eq(user_id));
        }

        if let Some(ref status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        select = select.order_by_desc(Column::UpdatedAt);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单页数失败: {e}")))?;

        let tickets = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: tickets.into_iter().map(|m| m.into_ticket()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 追加回复并按回复方推进工单状态
    pub async fn add_ticket_reply_impl(
        &self,
        ticket_id: i64,
        author_id: i64,
        body: String,
        is_staff: bool,
    ) -> Result<TicketReply> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("开启事务失败: {e}")))?;

        let ticket = SupportTickets::find_by_id(ticket_id)
            .one(&txn)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单失败: {e}")))?
            .ok_or_else(|| LearnHubError::not_found(format!("工单 {ticket_id} 不存在")))?;

        let status = ticket
            .status
            .parse::<TicketStatus>()
            .unwrap_or(TicketStatus::Open);
        if !status.accepts_replies() {
            return Err(LearnHubError::validation("工单已关闭，无法回复"));
        }

        let reply = ReplyActiveModel {
            ticket_id: Set(ticket_id),
            author_id: Set(author_id),
            body: Set(body),
            is_staff: Set(is_staff),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| LearnHubError::database_operation(format!("创建工单回复失败: {e}")))?;

        let mut active: ActiveModel = ticket.into();
        active.status = Set(status.after_reply(is_staff).to_string());
        active.updated_at = Set(now);
        active
            .update(&txn)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新工单失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(reply.into_reply())
    }

    pub async fn list_ticket_replies_impl(&self, ticket_id: i64) -> Result<Vec<TicketReply>> {
        let replies = TicketReplies::find()
            .filter(ReplyColumn::TicketId.eq(ticket_id))
            .order_by_asc(ReplyColumn::CreatedAt)
            .order_by_asc(ReplyColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单回复失败: {e}")))?;

        Ok(replies.into_iter().map(|m| m.into_reply()).collect())
    }

    pub async fn update_ticket_status_impl(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>> {
        let Some(ticket) = SupportTickets::find_by_id(ticket_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询工单失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut active: ActiveModel = ticket.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新工单状态失败: {e}")))?;

        Ok(Some(updated.into_ticket()))
    }

    pub async fn count_tickets_by_status_impl(&self, status: TicketStatus) -> Result<u64> {
        SupportTickets::find()
            .filter(Column::Status.eq(status.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("统计工单数量失败: {e}")))
    }
}
