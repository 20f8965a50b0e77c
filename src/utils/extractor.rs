//! 路径参数提取
//!
//! 路径中的 id 必须是正整数，否则直接返回 400 而不进入业务逻辑。

use actix_web::HttpResponse;

use crate::models::{ApiResponse, ErrorCode};

/// 解析路径中的 id
pub fn parse_positive_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

pub fn invalid_id_response(name: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::BadRequest,
        format!("Invalid path parameter '{name}'"),
    ))
}

/// 定义从路径参数中安全提取 i64 id 的类型
#[macro_export]
macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub i64);

        impl actix_web::FromRequest for $name {
            type Error = actix_web::Error;
            type Future = std::future::Ready<Result<Self, Self::Error>>;

            fn from_request(
                req: &actix_web::HttpRequest,
                _payload: &mut actix_web::dev::Payload,
            ) -> Self::Future {
                let parsed = req
                    .match_info()
                    .get($param)
                    .and_then($crate::utils::extractor::parse_positive_id);
                std::future::ready(match parsed {
                    Some(id) => Ok($name(id)),
                    None => Err(actix_web::error::InternalError::from_response(
                        concat!("invalid ", $param),
                        $crate::utils::extractor::invalid_id_response($param),
                    )
                    .into()),
                })
            }
        }
    };
}

crate::define_safe_i64_extractor!(SafeCourseIdI64, "course_id");
crate::define_safe_i64_extractor!(SafeTicketIdI64, "ticket_id");
crate::define_safe_i64_extractor!(SafeAnnouncementIdI64, "announcement_id");
crate::define_safe_i64_extractor!(SafeSubmissionIdI64, "submission_id");

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::FromRequest;
    use actix_web::test::TestRequest;

    #[test]
    fn test_parse_positive_id() {
        assert_eq!(parse_positive_id("42"), Some(42));
        assert_eq!(parse_positive_id("0"), None);
        assert_eq!(parse_positive_id("-3"), None);
        assert_eq!(parse_positive_id("abc"), None);
    }

    #[actix_web::test]
    async fn test_extracts_from_match_info() {
        let req = TestRequest::default()
            .param("course_id", "17")
            .to_http_request();
        let id = SafeCourseIdI64::extract(&req).await.unwrap();
        assert_eq!(id.0, 17);
    }

    #[actix_web::test]
    async fn test_rejects_missing_or_invalid() {
        let req = TestRequest::default()
            .param("course_id", "nope")
            .to_http_request();
        assert!(SafeCourseIdI64::extract(&req).await.is_err());

        let req = TestRequest::default().to_http_request();
        assert!(SafeTicketIdI64::extract(&req).await.is_err());
    }
}
