use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::integrations::{LlmClient, Mailer};
use crate::models::{ApiResponse, AppStartTime, system::responses::HealthResponse};
use crate::storage::Storage;

use super::optional_app_data;

pub struct SystemService;

impl SystemService {
    pub fn new_lazy() -> Self {
        Self
    }

    // 健康检查，数据库不可用时返回 503
    pub async fn health(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        let database = match optional_app_data::<dyn Storage>(request) {
            Some(storage) => match storage.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Health check: database unavailable: {}", e);
                    false
                }
            },
            None => false,
        };
        let llm_configured = optional_app_data::<dyn LlmClient>(request)
            .map(|llm| llm.is_configured())
            .unwrap_or(false);
        let email_provider = optional_app_data::<dyn Mailer>(request)
            .map(|mailer| mailer.provider().to_string())
            .unwrap_or_else(|| "none".to_string());

        let started_at = request
            .app_data::<actix_web::web::Data<AppStartTime>>()
            .map(|t| t.start_datetime)
            .unwrap_or_else(chrono::Utc::now);
        let uptime_seconds = (chrono::Utc::now() - started_at).num_seconds().max(0);

        let health = HealthResponse {
            status: if database { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            llm_configured,
            email_provider,
            uptime_seconds,
            started_at,
        };

        let response = if database {
            HttpResponse::Ok().json(ApiResponse::success(health, "Service is healthy"))
        } else {
            HttpResponse::ServiceUnavailable().json(ApiResponse::success(health, "Service is degraded"))
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_health_without_storage_is_degraded() {
        let req = TestRequest::default().to_http_request();
        let resp = SystemService::new_lazy().health(&req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
