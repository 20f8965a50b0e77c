use serde::Serialize;
use ts_rs::TS;

/// 客户端可识别的业务错误码
///
/// 0 表示成功；1xxx 通用错误，2xxx 用户与认证，3xxx 课程与资料，
/// 4xxx 积分，5xxx 工单，6xxx 公告，7xxx 提交，8xxx 外部服务。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    ValidationFailed = 1001,
    Unauthorized = 1002,
    Forbidden = 1003,
    NotFound = 1004,
    RateLimitExceeded = 1005,
    InternalServerError = 1006,

    AuthFailed = 2000,
    RegisterFailed = 2001,
    UserNameInvalid = 2002,
    UserEmailInvalid = 2003,
    UserPasswordInvalid = 2004,
    UserNameAlreadyExists = 2005,
    UserEmailAlreadyExists = 2006,
    UserNotFound = 2007,
    UserInactive = 2008,

    CourseNotFound = 3000,
    CourseCreationFailed = 3001,
    CourseNotReady = 3002,
    CoursePermissionDenied = 3003,
    CourseTopicInvalid = 3004,
    ChapterOutOfRange = 3006,

    InsufficientCredits = 4000,
    CreditAmountInvalid = 4001,

    TicketNotFound = 5000,
    TicketClosed = 5001,
    TicketPermissionDenied = 5002,
    TicketInvalid = 5003,

    AnnouncementNotFound = 6000,
    AnnouncementInvalid = 6001,

    SubmissionNotFound = 7000,
    SubmissionInvalid = 7001,
    GradingFailed = 7002,

    AiServiceUnavailable = 8000,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.as_i32(), 0);
        assert_eq!(ErrorCode::InsufficientCredits.as_i32(), 4000);
        assert_eq!(ErrorCode::AiServiceUnavailable.as_i32(), 8000);
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::NotFound.is_success());
    }
}
