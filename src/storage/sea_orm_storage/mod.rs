//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod announcements;
mod courses;
mod credits;
mod materials;
mod progress;
mod submissions;
mod tickets;
mod users;

use crate::config::AppConfig;
use crate::errors::{LearnHubError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// 分页参数收敛：页码从 1 开始，每页 1..=100
pub(crate) fn page_params(page: Option<i64>, size: Option<i64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1) as u64;
    let size = size.unwrap_or(10).clamp(1, 100) as u64;
    (page, size)
}

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| LearnHubError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| LearnHubError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| LearnHubError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(LearnHubError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }

    /// 单连接的内存 SQLite，供测试使用
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LearnHubError::database_config(format!("SQLite URL 解析失败: {e}")))?;

        // 内存库随连接销毁，连接池必须固定为一个常驻连接
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opt)
            .await
            .map_err(|e| LearnHubError::database_connection(format!("SQLite 连接失败: {e}")))?;

        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        Migrator::up(&db, None)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self { db })
    }

    /// 数据库连通性检查
    pub async fn ping_impl(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| LearnHubError::database_connection(format!("数据库不可用: {e}")))
    }
}

// Storage trait 实现
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
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn list_users(&self, query: UserListQuery) -> Result<Vec<User>> {
        self.list_users_impl(query).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    async fn count_users_by_role(&self, role: UserRole) -> Result<u64> {
        self.count_users_by_role_impl(role).await
    }

    // 课程模块
    async fn create_course(&self, course: NewCourse) -> Result<Course> {
        self.create_course_impl(course).await
    }

    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>> {
        self.get_course_by_id_impl(course_id).await
    }

    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<PaginatedResponse<Course>> {
        self.list_courses_with_pagination_impl(query).await
    }

    async fn save_course_layout(
        &self,
        course_id: i64,
        layout: &CourseLayout,
    ) -> Result<Option<Course>> {
        self.save_course_layout_impl(course_id, layout).await
    }

    async fn update_course_status(&self, course_id: i64, status: CourseStatus) -> Result<bool> {
        self.update_course_status_impl(course_id, status).await
    }

    async fn reset_course_for_regeneration(
        &self,
        course_id: i64,
        credits_charged: i64,
    ) -> Result<Option<Course>> {
        self.reset_course_for_regeneration_impl(course_id, credits_charged)
            .await
    }

    async fn delete_course(&self, course_id: i64) -> Result<bool> {
        self.delete_course_impl(course_id).await
    }

    async fn count_courses(&self) -> Result<u64> {
        self.count_courses_impl().await
    }

    async fn count_courses_by_status(&self, status: CourseStatus) -> Result<u64> {
        self.count_courses_by_status_impl(status).await
    }

    // 学习资料模块
    async fn upsert_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
        status: MaterialStatus,
        content: Option<serde_json::Value>,
    ) -> Result<StudyMaterial> {
        self.upsert_material_impl(course_id, material_type, chapter_index, status, content)
            .await
    }

    async fn claim_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>> {
        self.claim_material_impl(course_id, material_type, chapter_index)
            .await
    }

    async fn get_material(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>> {
        self.get_material_impl(course_id, material_type, chapter_index)
            .await
    }

    async fn list_materials(
        &self,
        course_id: i64,
        material_type: Option<MaterialType>,
    ) -> Result<Vec<StudyMaterial>> {
        self.list_materials_impl(course_id, material_type).await
    }

    // 进度与徽章模块
    async fn upsert_progress(
        &self,
        user_id: i64,
        course_id: i64,
        completed_chapters: Vec<i32>,
        percent: i32,
    ) -> Result<Progress> {
        self.upsert_progress_impl(user_id, course_id, completed_chapters, percent)
            .await
    }

    async fn get_progress(&self, user_id: i64, course_id: i64) -> Result<Option<Progress>> {
        self.get_progress_impl(user_id, course_id).await
    }

    async fn list_progress_by_user(&self, user_id: i64) -> Result<Vec<Progress>> {
        self.list_progress_by_user_impl(user_id).await
    }

    async fn list_badges_by_user(&self, user_id: i64) -> Result<Vec<Badge>> {
        self.list_badges_by_user_impl(user_id).await
    }

    async fn award_badges(&self, user_id: i64, keys: &[BadgeKey]) -> Result<Vec<Badge>> {
        self.award_badges_impl(user_id, keys).await
    }

    // 积分模块
    async fn apply_credit_change(&self, change: CreditChange) -> Result<CreditTransaction> {
        self.apply_credit_change_impl(change).await
    }

    async fn list_credit_transactions_with_pagination(
        &self,
        query: TransactionListQuery,
    ) -> Result<PaginatedResponse<CreditTransaction>> {
        self.list_credit_transactions_with_pagination_impl(query)
            .await
    }

    async fn list_credit_transactions(
        &self,
        user_id: Option<i64>,
        kind: Option<CreditKind>,
    ) -> Result<Vec<CreditTransaction>> {
        self.list_credit_transactions_impl(user_id, kind).await
    }

    async fn list_credit_amounts(&self, kind: CreditKind) -> Result<Vec<i64>> {
        self.list_credit_amounts_impl(kind).await
    }

    // 工单模块
    async fn create_ticket(
        &self,
        user_id: i64,
        is_staff: bool,
        ticket: CreateTicketRequest,
    ) -> Result<SupportTicket> {
        self.create_ticket_impl(user_id, is_staff, ticket).await
    }

    async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<SupportTicket>> {
        self.get_ticket_by_id_impl(ticket_id).await
    }

    async fn list_tickets_with_pagination(
        &self,
        query: TicketListQuery,
    ) -> Result<PaginatedResponse<SupportTicket>> {
        self.list_tickets_with_pagination_impl(query).await
    }

    async fn add_ticket_reply(
        &self,
        ticket_id: i64,
        author_id: i64,
        body: String,
        is_staff: bool,
    ) -> Result<TicketReply> {
        self.add_ticket_reply_impl(ticket_id, author_id, body, is_staff)
            .await
    }

    async fn list_ticket_replies(&self, ticket_id: i64) -> Result<Vec<TicketReply>> {
        self.list_ticket_replies_impl(ticket_id).await
    }

    async fn update_ticket_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>> {
        self.update_ticket_status_impl(ticket_id, status).await
    }

    async fn count_tickets_by_status(&self, status: TicketStatus) -> Result<u64> {
        self.count_tickets_by_status_impl(status).await
    }

    // 公告模块
    async fn create_announcement(
        &self,
        author_id: i64,
        announcement: CreateAnnouncementRequest,
    ) -> Result<Announcement> {
        self.create_announcement_impl(author_id, announcement).await
    }

    async fn get_announcement_by_id(&self, announcement_id: i64) -> Result<Option<Announcement>> {
        self.get_announcement_by_id_impl(announcement_id).await
    }

    async fn list_announcements_with_pagination(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<PaginatedResponse<Announcement>> {
        self.list_announcements_with_pagination_impl(query).await
    }

    async fn update_announcement(
        &self,
        announcement_id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>> {
        self.update_announcement_impl(announcement_id, update).await
    }

    async fn delete_announcement(&self, announcement_id: i64) -> Result<bool> {
        self.delete_announcement_impl(announcement_id).await
    }

    // 提交模块
    async fn create_submission(
        &self,
        course_id: i64,
        user_id: i64,
        submission: CreateSubmissionRequest,
    ) -> Result<Submission> {
        self.create_submission_impl(course_id, user_id, submission)
            .await
    }

    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(submission_id).await
    }

    async fn list_submissions_with_pagination(
        &self,
        query: SubmissionListQuery,
    ) -> Result<PaginatedResponse<Submission>> {
        self.list_submissions_with_pagination_impl(query).await
    }

    async fn record_grade(
        &self,
        submission_id: i64,
        status: SubmissionStatus,
        score: Option<i32>,
        feedback: Option<String>,
    ) -> Result<Option<Submission>> {
        self.record_grade_impl(submission_id, status, score, feedback)
            .await
    }

    async fn count_perfect_submissions(&self, user_id: i64) -> Result<u64> {
        self.count_perfect_submissions_impl(user_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.ping_impl().await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::SeaOrmStorage;
    use crate::models::courses::{
        entities::{Course, CourseType, Difficulty},
        requests::NewCourse,
    };
    use crate::models::users::{
        entities::{User, UserRole},
        requests::CreateUserRequest,
    };

    pub(crate) async fn storage_with_user(credits: i64) -> (SeaOrmStorage, User) {
        let storage = SeaOrmStorage::in_memory().await.unwrap();
        let user = storage
            .create_user_impl(CreateUserRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::User,
                display_name: None,
                initial_credits: credits,
            })
            .await
            .unwrap();
        (storage, user)
    }

    pub(crate) async fn seed_course(storage: &SeaOrmStorage, creator_id: i64, cost: i64) -> Course {
        storage
            .create_course_impl(NewCourse {
                creator_id,
                topic: "Rust ownership".to_string(),
                course_type: CourseType::Standard,
                difficulty: Difficulty::Moderate,
                chapter_count: 3,
                credits_charged: cost,
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url("learnhub.db").unwrap(),
            "sqlite://learnhub.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("postgres://u:p@localhost/lh").unwrap(),
            "postgres://u:p@localhost/lh"
        );
        assert!(SeaOrmStorage::build_database_url("ftp://nowhere").is_err());
    }

    #[test]
    fn test_page_params() {
        assert_eq!(page_params(None, None), (1, 10));
        assert_eq!(page_params(Some(0), Some(1000)), (1, 100));
        assert_eq!(page_params(Some(3), Some(0)), (3, 1));
    }
}
