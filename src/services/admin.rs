//! 管理后台：统计与用户导出
//!
//! 统计结果缓存 `cache.stats_ttl` 秒，过期后下一次请求重新计算。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::cache::{ObjectCache, get_json, insert_json};
use crate::config::AppConfig;
use crate::errors::LearnHubError;
use crate::models::{
    ApiResponse,
    admin::responses::{CourseCounts, DashboardStats, RoleCounts},
    courses::entities::CourseStatus,
    credits::entities::CreditKind,
    tickets::entities::TicketStatus,
    users::{entities::UserRole, requests::UserListQuery},
};
use crate::storage::Storage;
use crate::utils::credit_ledger::total_spent;
use crate::utils::csv_export::{csv_attachment, users_csv};

use super::{ServiceResult, app_data, error_response, finish, optional_app_data};

const STATS_CACHE_KEY: &str = "admin:stats";

/// 扣费总额减去退款，不低于 0
pub fn net_credits_spent(deductions: &[i64], refunds: &[i64]) -> i64 {
    let refunded: i64 = refunds.iter().filter(|a| **a > 0).sum();
    (total_spent(deductions) - refunded).max(0)
}

async fn compute_stats(storage: &dyn Storage) -> Result<DashboardStats, LearnHubError> {
    let count = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);

    let users_by_role = RoleCounts {
        user: count(storage.count_users_by_role(UserRole::User).await?),
        teacher: count(storage.count_users_by_role(UserRole::Teacher).await?),
        admin: count(storage.count_users_by_role(UserRole::Admin).await?),
    };
    let courses_by_status = CourseCounts {
        generating: count(storage.count_courses_by_status(CourseStatus::Generating).await?),
        ready: count(storage.count_courses_by_status(CourseStatus::Ready).await?),
        failed: count(storage.count_courses_by_status(CourseStatus::Failed).await?),
    };
    let open_tickets = count(storage.count_tickets_by_status(TicketStatus::Open).await?)
        + count(storage.count_tickets_by_status(TicketStatus::InProgress).await?);

    let deductions = storage.list_credit_amounts(CreditKind::Deduction).await?;
    let refunds = storage.list_credit_amounts(CreditKind::Refund).await?;

    Ok(DashboardStats {
        total_users: count(storage.count_users().await?),
        users_by_role,
        total_courses: count(storage.count_courses().await?),
        courses_by_status,
        open_tickets,
        credits_spent: net_credits_spent(&deductions, &refunds),
        generated_at: chrono::Utc::now(),
    })
}

pub struct AdminService {
    storage: Option<Arc<dyn Storage>>,
}

impl AdminService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    pub async fn get_stats(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        finish(self.stats(request).await)
    }

    async fn stats(&self, request: &HttpRequest) -> ServiceResult {
        let cache = optional_app_data::<dyn ObjectCache>(request);

        if let Some(cache) = cache.as_deref() {
            if let Some(stats) = get_json::<DashboardStats>(cache, STATS_CACHE_KEY).await {
                return Ok(HttpResponse::Ok().json(ApiResponse::success(stats, "Statistics retrieved")));
            }
        }

        let storage = self.get_storage(request)?;
        let stats = compute_stats(storage.as_ref())
            .await
            .map_err(|e| error_response(&e))?;

        if let Some(cache) = cache.as_deref() {
            insert_json(
                cache,
                STATS_CACHE_KEY,
                &stats,
                AppConfig::get().cache.stats_ttl,
            )
            .await;
        }

        Ok(HttpResponse::Ok().json(ApiResponse::success(stats, "Statistics retrieved")))
    }

    pub async fn export_users(
        &self,
        request: &HttpRequest,
        query: UserListQuery,
    ) -> ActixResult<HttpResponse> {
        finish(self.export(request, query).await)
    }

    async fn export(&self, request: &HttpRequest, query: UserListQuery) -> ServiceResult {
        let storage = self.get_storage(request)?;

        let users = storage
            .list_users(query)
            .await
            .map_err(|e| error_response(&e))?;
        let body = users_csv(&users).map_err(|e| error_response(&e))?;

        tracing::info!("Exported {} users", users.len());
        Ok(csv_attachment("users.csv", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refunds_reduce_spending() {
        assert_eq!(net_credits_spent(&[-20, -5, -5], &[5]), 25);
        assert_eq!(net_credits_spent(&[-20], &[20, 20]), 0);
        assert_eq!(net_credits_spent(&[], &[]), 0);
    }
}
