pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod regenerate;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{
    ErrorCode,
    courses::{
        entities::Course,
        requests::{CourseListParams, CreateCourseRequest},
    },
    users::entities::{User, UserRole},
};
use crate::storage::Storage;

use super::{app_data, error_response, forbidden, not_found};

pub struct CourseService {
    storage: Option<Arc<dyn Storage>>,
}

impl CourseService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    // 课程列表：普通用户与教师看到自己的课程，管理员看到全部
    pub async fn list_courses(
        &self,
        request: &HttpRequest,
        params: CourseListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_courses(self, request, params).await
    }

    // 扣费并在后台生成课程
    pub async fn create_course(
        &self,
        request: &HttpRequest,
        create_request: CreateCourseRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_course(self, request, create_request).await
    }

    pub async fn get_course(&self, request: &HttpRequest, course_id: i64) -> ActixResult<HttpResponse> {
        get::get_course(self, request, course_id).await
    }

    pub async fn delete_course(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        delete::delete_course(self, request, course_id).await
    }

    // 重新生成失败或不满意的课程，重新扣费
    pub async fn regenerate_course(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        regenerate::regenerate_course(self, request, course_id).await
    }
}

/// 读取课程，不存在时返回 404
pub(crate) async fn load_course(storage: &dyn Storage, course_id: i64) -> Result<Course, HttpResponse> {
    storage
        .get_course_by_id(course_id)
        .await
        .map_err(|e| error_response(&e))?
        .ok_or_else(|| not_found(ErrorCode::CourseNotFound, "Course not found"))
}

/// 创建者与教职人员可以查看课程
pub(crate) fn can_view(user: &User, course: &Course) -> bool {
    course.creator_id == user.id || user.role.is_staff()
}

/// 创建者与管理员可以删除课程
pub(crate) fn can_manage(user: &User, course: &Course) -> bool {
    course.creator_id == user.id || user.role == UserRole::Admin
}

pub(crate) fn ensure_owner(user: &User, course: &Course) -> Result<(), HttpResponse> {
    if course.creator_id == user.id {
        Ok(())
    } else {
        Err(forbidden(
            ErrorCode::CoursePermissionDenied,
            "Only the course creator can do this",
        ))
    }
}

pub(crate) fn ensure_can_view(user: &User, course: &Course) -> Result<(), HttpResponse> {
    if can_view(user, course) {
        Ok(())
    } else {
        Err(forbidden(
            ErrorCode::CoursePermissionDenied,
            "You do not have access to this course",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::{CourseStatus, CourseType, Difficulty};
    use crate::models::users::entities::UserStatus;

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            username: format!("user_{id}"),
            email: format!("user{id}@example.com"),
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

    fn course_of(creator_id: i64) -> Course {
        Course {
            id: 1,
            creator_id,
            topic: "Compilers".into(),
            title: None,
            course_type: CourseType::Standard,
            difficulty: Difficulty::Hard,
            layout: None,
            status: CourseStatus::Ready,
            chapter_count: 4,
            requested_chapters: 4,
            credits_charged: 20,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_course_access_rules() {
        let course = course_of(10);
        let owner = user(10, UserRole::User);
        let other = user(11, UserRole::User);
        let teacher = user(12, UserRole::Teacher);
        let admin = user(13, UserRole::Admin);

        assert!(can_view(&owner, &course));
        assert!(!can_view(&other, &course));
        assert!(can_view(&teacher, &course));

        assert!(can_manage(&owner, &course));
        assert!(!can_manage(&teacher, &course));
        assert!(can_manage(&admin, &course));

        assert!(ensure_owner(&owner, &course).is_ok());
        assert!(ensure_owner(&admin, &course).is_err());
    }
}
