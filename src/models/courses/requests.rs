use super::entities::{CourseStatus, CourseType, Difficulty};
use crate::models::common::PaginationQuery;
use serde::Deserialize;
use ts_rs::TS;

// 创建课程请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CreateCourseRequest {
    pub topic: String,
    #[serde(default)]
    pub course_type: CourseType,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// 期望章节数，缺省时由配置决定
    pub chapter_count: Option<i32>,
}

// 课程列表查询参数
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub status: Option<CourseStatus>,
    pub search: Option<String>,
}

// 课程列表查询（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct CourseListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// 为空时列出全部课程（管理员）
    pub creator_id: Option<i64>,
    pub status: Option<CourseStatus>,
    pub search: Option<String>,
}

// 新建课程（扣费后写入）
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub creator_id: i64,
    pub topic: String,
    pub course_type: CourseType,
    pub difficulty: Difficulty,
    pub chapter_count: i32,
    pub credits_charged: i64,
}
