pub mod admin;
pub mod announcements;
pub mod auth;
pub mod common;
pub mod courses;
pub mod credits;
pub mod materials;
pub mod progress;
pub mod submissions;
pub mod system;
pub mod tickets;
pub mod users;

pub use common::{ApiResponse, ErrorCode, PaginatedResponse, PaginationInfo, PaginationQuery};

/// 程序启动时间，用于健康检查计算运行时长
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}
