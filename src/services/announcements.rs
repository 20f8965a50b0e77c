use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use crate::models::{
    ApiResponse, ErrorCode,
    announcements::{
        entities::{Announcement, Audience},
        requests::{
            AnnouncementListParams, AnnouncementListQuery, CreateAnnouncementRequest,
            UpdateAnnouncementRequest,
        },
    },
    users::entities::{User, UserRole},
};
use crate::storage::Storage;
use crate::utils::validate::validate_text;

use super::{ServiceResult, app_data, bad_request, current_user, error_response, finish, forbidden, not_found};

const MAX_TITLE_CHARS: usize = 200;
const MAX_BODY_CHARS: usize = 10_000;

fn invalid(msg: impl Into<String>) -> HttpResponse {
    bad_request(ErrorCode::AnnouncementInvalid, msg)
}

fn check_expiry(expires_at: Option<chrono::DateTime<chrono::Utc>>) -> Result<(), HttpResponse> {
    match expires_at {
        Some(at) if at <= chrono::Utc::now() => Err(invalid("expires_at must be in the future")),
        _ => Ok(()),
    }
}

/// 作者与管理员可以修改公告
fn ensure_editable(user: &User, announcement: &Announcement) -> Result<(), HttpResponse> {
    if announcement.author_id == user.id || user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(forbidden(
            ErrorCode::Forbidden,
            "Only the author or an admin can modify this announcement",
        ))
    }
}

/// 按角色与是否包含过期公告构造查询
fn visibility_query(user: &User, params: &AnnouncementListParams) -> AnnouncementListQuery {
    let include_expired = params.include_expired && user.role.is_staff();
    AnnouncementListQuery {
        page: Some(params.pagination.page),
        size: Some(params.pagination.size),
        audiences: Audience::for_role(user.role),
        active_at: (!include_expired).then(chrono::Utc::now),
    }
}

pub struct AnnouncementService {
    storage: Option<Arc<dyn Storage>>,
}

impl AnnouncementService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    async fn load(&self, storage: &dyn Storage, announcement_id: i64) -> Result<Announcement, HttpResponse> {
        storage
            .get_announcement_by_id(announcement_id)
            .await
            .map_err(|e| error_response(&e))?
            .ok_or_else(|| not_found(ErrorCode::AnnouncementNotFound, "Announcement not found"))
    }

    // 置顶优先，其次按发布时间倒序
    pub async fn list_announcements(
        &self,
        request: &HttpRequest,
        params: AnnouncementListParams,
    ) -> ActixResult<HttpResponse> {
        finish(self.list(request, params).await)
    }

    async fn list(&self, request: &HttpRequest, params: AnnouncementListParams) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let page = storage
            .list_announcements_with_pagination(visibility_query(&user, &params))
            .await
            .map_err(|e| error_response(&e))?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(page, "Announcements retrieved")))
    }

    pub async fn create_announcement(
        &self,
        request: &HttpRequest,
        announcement: CreateAnnouncementRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.create(request, announcement).await)
    }

    async fn create(&self, request: &HttpRequest, mut announcement: CreateAnnouncementRequest) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        announcement.title = announcement.title.trim().to_string();
        validate_text("Title", &announcement.title, MAX_TITLE_CHARS).map_err(invalid)?;
        validate_text("Body", &announcement.body, MAX_BODY_CHARS).map_err(invalid)?;
        check_expiry(announcement.expires_at)?;

        let created = storage
            .create_announcement(user.id, announcement)
            .await
            .map_err(|e| error_response(&e))?;

        info!("Announcement {} published by user {}", created.id, user.id);
        Ok(HttpResponse::Created().json(ApiResponse::success(created, "Announcement created")))
    }

    pub async fn update_announcement(
        &self,
        request: &HttpRequest,
        announcement_id: i64,
        update: UpdateAnnouncementRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.update(request, announcement_id, update).await)
    }

    async fn update(
        &self,
        request: &HttpRequest,
        announcement_id: i64,
        mut update: UpdateAnnouncementRequest,
    ) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let existing = self.load(storage.as_ref(), announcement_id).await?;
        ensure_editable(&user, &existing)?;

        if let Some(title) = update.title.as_mut() {
            *title = title.trim().to_string();
            validate_text("Title", title, MAX_TITLE_CHARS).map_err(invalid)?;
        }
        if let Some(body) = &update.body {
            validate_text("Body", body, MAX_BODY_CHARS).map_err(invalid)?;
        }
        check_expiry(update.expires_at)?;

        let updated = storage
            .update_announcement(announcement_id, update)
            .await
            .map_err(|e| error_response(&e))?
            .ok_or_else(|| not_found(ErrorCode::AnnouncementNotFound, "Announcement not found"))?;

        Ok(HttpResponse::Ok().json(ApiResponse::success(updated, "Announcement updated")))
    }

    pub async fn delete_announcement(
        &self,
        request: &HttpRequest,
        announcement_id: i64,
    ) -> ActixResult<HttpResponse> {
        finish(self.delete(request, announcement_id).await)
    }

    async fn delete(&self, request: &HttpRequest, announcement_id: i64) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;

        let existing = self.load(storage.as_ref(), announcement_id).await?;
        ensure_editable(&user, &existing)?;

        if !storage
            .delete_announcement(announcement_id)
            .await
            .map_err(|e| error_response(&e))?
        {
            return Err(not_found(ErrorCode::AnnouncementNotFound, "Announcement not found"));
        }

        info!("Announcement {} deleted by user {}", announcement_id, user.id);
        Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Announcement deleted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationQuery;
    use crate::models::users::entities::UserStatus;

    fn user(role: UserRole) -> User {
        User {
            id: 4,
            username: "someone".into(),
            email: "someone@example.com".into(),
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

    fn params(include_expired: bool) -> AnnouncementListParams {
        AnnouncementListParams {
            pagination: PaginationQuery::default(),
            include_expired,
        }
    }

    #[test]
    fn test_students_never_see_expired() {
        let query = visibility_query(&user(UserRole::User), &params(true));
        assert!(query.active_at.is_some());
        assert_eq!(query.audiences, vec![Audience::All, Audience::Students]);
    }

    #[test]
    fn test_staff_may_include_expired() {
        let query = visibility_query(&user(UserRole::Teacher), &params(true));
        assert!(query.active_at.is_none());

        let query = visibility_query(&user(UserRole::Teacher), &params(false));
        assert!(query.active_at.is_some());
    }

    #[test]
    fn test_expiry_must_be_future() {
        assert!(check_expiry(None).is_ok());
        assert!(check_expiry(Some(chrono::Utc::now() + chrono::Duration::hours(1))).is_ok());
        assert!(check_expiry(Some(chrono::Utc::now() - chrono::Duration::hours(1))).is_err());
    }
}
