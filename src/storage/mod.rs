use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{
    PaginatedResponse,
    announcements::{
        entities::Announcement,
        requests::{AnnouncementListQuery, CreateAnnouncementRequest, UpdateAnnouncementRequest},
    },
    courses::{
        entities::{Course, CourseLayout, CourseStatus},
        requests::{CourseListQuery, NewCourse},
    },
    credits::{
        entities::{CreditKind, CreditTransaction},
        requests::{CreditChange, TransactionListQuery},
    },
    materials::entities::{MaterialStatus, MaterialType, StudyMaterial},
    progress::entities::{Badge, BadgeKey, Progress},
    submissions::{
        entities::{Submission, SubmissionStatus},
        requests::{CreateSubmissionRequest, SubmissionListQuery},
    },
    tickets::{
        entities::{SupportTicket, TicketReply, TicketStatus},
        requests::{CreateTicketRequest, TicketListQuery},
    },
    users::{
        entities::{User, UserRole},
        requests::{CreateUserRequest, UserListQuery},
    },
};
use crate::utils::retry::{log_retry, retry_with_backoff_observed};

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户，初始积分同时写入流水
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过用户名或邮箱获取用户信息
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    // 列出全部符合条件的用户（导出用）
    async fn list_users(&self, query: UserListQuery) -> Result<Vec<User>>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    // 用户总数
    async fn count_users(&self) -> Result<u64>;
    // 按角色统计用户
    async fn count_users_by_role(&self, role: UserRole) -> Result<u64>;

    /// 课程管理方法
    async fn create_course(&self, course: NewCourse) -> Result<Course>;
    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>>;
    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<PaginatedResponse<Course>>;
    // 写入生成好的大纲并标记为 ready
    async fn save_course_layout(
        &self,
        course_id: i64,
        layout: &CourseLayout,
    ) -> Result<Option<Course>>;
    async fn update_course_status(&self, course_id: i64, status: CourseStatus) -> Result<bool>;
    // 重新生成前清空大纲并记录新的扣费，课程正在生成或不存在时返回 None
    async fn reset_course_for_regeneration(
        &self,
        course_id: i64,
        credits_charged: i64,
    ) -> Result<Option<Course>>;
    async fn delete_course(&self, course_id: i64) -> Result<bool>;
    async fn count_courses(&self) -> Result<u64>;
    async fn count_courses_by_status(&self, status: CourseStatus) -> Result<u64>;

    /// 学习资料方法
    // 按 (course_id, material_type, chapter_index) 写入或覆盖
    async fn upsert_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
        status: MaterialStatus,
        content: Option<serde_json::Value>,
    ) -> Result<StudyMaterial>;
    // 原子地占用资料生成，已在生成中时返回 None
    async fn claim_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>>;
    async fn get_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>>;
    async fn list_materials(
        &self,
        course_id: i64,
        material_type: Option<MaterialType>,
    ) -> Result<Vec<StudyMaterial>>;

    /// 学习进度与徽章
    async fn upsert_progress(
        &self,
        user_id: i64,
        course_id: i64,
        completed_chapters: Vec<i32>,
        percent: i32,
    ) -> Result<Progress>;
    async fn get_progress(&self, user_id: i64, course_id: i64) -> Result<Option<Progress>>;
    async fn list_progress_by_user(&self, user_id: i64) -> Result<Vec<Progress>>;
    async fn list_badges_by_user(&self, user_id: i64) -> Result<Vec<Badge>>;
    // 只插入尚未持有的徽章，返回新授予的部分
    async fn award_badges(&self, user_id: i64, keys: &[BadgeKey]) -> Result<Vec<Badge>>;

    /// 积分方法
    // 在事务内更新余额并写入流水
    async fn apply_credit_change(&self, change: CreditChange) -> Result<CreditTransaction>;
    async fn list_credit_transactions_with_pagination(
        &self,
        query: TransactionListQuery,
    ) -> Result<PaginatedResponse<CreditTransaction>>;
    async fn list_credit_transactions(
        &self,
        user_id: Option<i64>,
        kind: Option<CreditKind>,
    ) -> Result<Vec<CreditTransaction>>;
    // 某一类型流水的金额列表（统计用）
    async fn list_credit_amounts(&self, kind: CreditKind) -> Result<Vec<i64>>;

    /// 工单方法
    // 创建工单，首条消息作为第一条回复
    async fn create_ticket(
        &self,
        user_id: i64,
        is_staff: bool,
        ticket: CreateTicketRequest,
    ) -> Result<SupportTicket>;
    async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<SupportTicket>>;
    async fn list_tickets_with_pagination(
        &self,
        query: TicketListQuery,
    ) -> Result<PaginatedResponse<SupportTicket>>;
    async fn add_ticket_reply(
        &self,
        ticket_id: i64,
        author_id: i64,
        body: String,
        is_staff: bool,
    ) -> Result<TicketReply>;
    async fn list_ticket_replies(&self, ticket_id: i64) -> Result<Vec<TicketReply>>;
    async fn update_ticket_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>>;
    async fn count_tickets_by_status(&self, status: TicketStatus) -> Result<u64>;

    /// 公告方法
    async fn create_announcement(
        &self,
        author_id: i64,
        announcement: CreateAnnouncementRequest,
    ) -> Result<Announcement>;
    async fn get_announcement_by_id(&self, announcement_id: i64) -> Result<Option<Announcement>>;
    async fn list_announcements_with_pagination(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<PaginatedResponse<Announcement>>;
    async fn update_announcement(
        &self,
        announcement_id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>>;
    async fn delete_announcement(&self, announcement_id: i64) -> Result<bool>;

    /// 提交与评分方法
    async fn create_submission(
        &self,
        course_id: i64,
        user_id: i64,
        submission: CreateSubmissionRequest,
    ) -> Result<Submission>;
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;
    async fn list_submissions_with_pagination(
        &self,
        query: SubmissionListQuery,
    ) -> Result<PaginatedResponse<Submission>>;
    async fn record_grade(
        &self,
        submission_id: i64,
        status: SubmissionStatus,
        score: Option<i32>,
        feedback: Option<String>,
    ) -> Result<Option<Submission>>;
    // 满分提交数量（徽章规则用）
    async fn count_perfect_submissions(&self, user_id: i64) -> Result<u64>;

    /// 健康检查
    async fn ping(&self) -> Result<()>;
}

/// 冷启动时数据库可能尚未就绪，连接按 `retry.database` 配置重试
pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let retry = &AppConfig::get().retry.database;
    let storage = retry_with_backoff_observed(
        retry,
        sea_orm_storage::SeaOrmStorage::new_async,
        log_retry("storage.connect"),
    )
    .await?;
    Ok(Arc::new(storage))
}
