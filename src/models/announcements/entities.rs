use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::users::entities::UserRole;

crate::define_string_enum! {
    /// 公告受众
    pub enum Audience => "../frontend/src/types/generated/announcement.ts" {
        All = "all",
        Students = "students",
        Teachers = "teachers",
    }
}

impl Default for Audience {
    fn default() -> Self {
        Audience::All
    }
}

impl Audience {
    /// 管理员可见全部公告
    pub fn visible_to(&self, role: UserRole) -> bool {
        match (self, role) {
            (_, UserRole::Admin) => true,
            (Audience::All, _) => true,
            (Audience::Students, UserRole::User) => true,
            (Audience::Teachers, UserRole::Teacher) => true,
            _ => false,
        }
    }

    /// 指定角色可见的受众集合
    pub fn for_role(role: UserRole) -> Vec<Audience> {
        Audience::ALL
            .iter()
            .copied()
            .filter(|a| a.visible_to(role))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct Announcement {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub is_pinned: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Announcement {
    pub fn is_active_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_visibility() {
        assert_eq!(
            Audience::for_role(UserRole::User),
            vec![Audience::All, Audience::Students]
        );
        assert_eq!(
            Audience::for_role(UserRole::Teacher),
            vec![Audience::All, Audience::Teachers]
        );
        assert_eq!(Audience::for_role(UserRole::Admin).len(), 3);
    }

    #[test]
    fn test_expiry() {
        let now = chrono::Utc::now();
        let mut a = Announcement {
            id: 1,
            author_id: 1,
            title: "Maintenance".into(),
            body: "Tonight".into(),
            audience: Audience::All,
            is_pinned: false,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(a.is_active_at(now));
        a.expires_at = Some(now - chrono::Duration::minutes(1));
        assert!(!a.is_active_at(now));
    }
}
