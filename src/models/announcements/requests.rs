use super::entities::Audience;
use crate::models::common::{PaginationQuery, pagination::deserialize_lenient_bool};
use serde::Deserialize;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub is_pinned: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<Audience>,
    pub is_pinned: Option<bool>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct AnnouncementListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    /// 仅教职人员生效
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub include_expired: bool,
}

// 公告列表查询（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct AnnouncementListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub audiences: Vec<Audience>,
    /// 为 Some 时过滤掉该时刻之前过期的公告
    pub active_at: Option<chrono::DateTime<chrono::Utc>>,
}
