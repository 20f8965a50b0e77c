use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/admin.ts")]
pub struct RoleCounts {
    pub user: i64,
    pub teacher: i64,
    pub admin: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/admin.ts")]
pub struct CourseCounts {
    pub generating: i64,
    pub ready: i64,
    pub failed: i64,
}

// 管理后台统计，带缓存时间
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/admin.ts")]
pub struct DashboardStats {
    pub total_users: i64,
    pub users_by_role: RoleCounts,
    pub total_courses: i64,
    pub courses_by_status: CourseCounts,
    pub open_tickets: i64,
    pub credits_spent: i64,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
