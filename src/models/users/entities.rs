use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::utils::jwt::{JwtUtils, TokenPair};

crate::define_string_enum! {
    /// 用户角色
    pub enum UserRole => "../frontend/src/types/generated/user.ts" {
        User = "user",
        Teacher = "teacher",
        Admin = "admin",
    }
}

impl UserRole {
    pub fn admin_roles() -> &'static [UserRole] {
        &[UserRole::Admin]
    }

    /// 可以处理工单、发布公告、查看他人提交的角色
    pub fn staff_roles() -> &'static [UserRole] {
        &[UserRole::Teacher, UserRole::Admin]
    }

    pub fn all_roles() -> &'static [UserRole] {
        UserRole::ALL
    }

    pub fn is_staff(&self) -> bool {
        Self::staff_roles().contains(self)
    }
}

crate::define_string_enum! {
    /// 用户状态
    pub enum UserStatus => "../frontend/src/types/generated/user.ts" {
        Active = "active",
        Inactive = "inactive",
        Suspended = "suspended",
    }
}

// 用户实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/user.ts")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub display_name: Option<String>,
    pub credits: i64,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// 邮件称呼，优先使用展示名
    pub fn greeting_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    // 生成 token 对（access + refresh）
    pub fn generate_token_pair(
        &self,
        refresh_token_expiry: Option<chrono::TimeDelta>,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        JwtUtils::generate_token_pair(self.id, self.role.as_str(), refresh_token_expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles() {
        assert!(UserRole::Teacher.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(!UserRole::User.is_staff());
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert_eq!("teacher".parse::<UserRole>().unwrap(), UserRole::Teacher);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let now = chrono::Utc::now();
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "secret".into(),
            role: UserRole::User,
            status: UserStatus::Active,
            display_name: None,
            credits: 10,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(user.greeting_name(), "alice");
    }
}
