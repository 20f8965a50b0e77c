use super::{SeaOrmStorage, page_params};
use crate::entity::announcements::{ActiveModel, Column, Entity as Announcements};
use crate::errors::{LearnHubError, Result};
use crate::models::{
    PaginatedResponse, PaginationInfo,
    announcements::{
        entities::Announcement,
        requests::{AnnouncementListQuery, CreateAnnouncementRequest, UpdateAnnouncementRequest},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};

impl SeaOrmStorage {
    pub async fn create_announcement_impl(
        &self,
        author_id: i64,
        req: CreateAnnouncementRequest,
    ) -> Result<Announcement> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            author_id: Set(author_id),
            title: Set(req.title),
            body: Set(req.body),
            audience: Set(req.audience.to_string()),
            is_pinned: Set(req.is_pinned),
            expires_at: Set(req.expires_at.map(|t| t.timestamp())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("创建公告失败: {e}")))?;

        Ok(result.into_announcement())
    }

    pub async fn get_announcement_by_id_impl(
        &self,
        announcement_id: i64,
    ) -> Result<Option<Announcement>> {
        let result = Announcements::find_by_id(announcement_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询公告失败: {e}")))?;

        Ok(result.map(|m| m.into_announcement()))
    }

    /// 分页列出公告，置顶的在前，其余按发布时间倒序
    pub async fn list_announcements_with_pagination_impl(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<PaginatedResponse<Announcement>> {
        let (page, size) = page_params(query.page, query.size);

        let audiences: Vec<String> = query.audiences.iter().map(|a| a.to_string()).collect();
        let mut select = Announcements::find().filter(Column::Audience.is_in(audiences));

        if let Some(active_at) = query.active_at {
            select = select.filter(
                Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gt(active_at.timestamp())),
            );
        }

        select = select
            .order_by_desc(Column::IsPinned)
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询公告总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询公告页数失败: {e}")))?;

        let announcements = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询公告列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: announcements
                .into_iter()
                .map(|m| m.into_announcement())
                .collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_announcement_impl(
        &self,
        announcement_id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>> {
        let Some(existing) = Announcements::find_by_id(announcement_id)
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询公告失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        model.updated_at = Set(chrono::Utc::now().timestamp());

        if let Some(title) = update.title {
            model.title = Set(title);
        }

        if let Some(body) = update.body {
            model.body = Set(body);
        }

        if let Some(audience) = update.audience {
            model.audience = Set(audience.to_string());
        }

        if let Some(is_pinned) = update.is_pinned {
            model.is_pinned = Set(is_pinned);
        }

        if let Some(expires_at) = update.expires_at {
            model.expires_at = Set(Some(expires_at.timestamp()));
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新公告失败: {e}")))?;

        Ok(Some(updated.into_announcement()))
    }

    pub async fn delete_announcement_impl(&self, announcement_id: i64) -> Result<bool> {
        let result = Announcements::delete_by_id(announcement_id)
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("删除公告失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}
