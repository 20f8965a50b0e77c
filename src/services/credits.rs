//! 积分余额、流水与发放
//!
//! 所有余额变动都经过 [`apply_credit_change`]：写流水、清理用户缓存、
//! 必要时发送低余额提醒。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::cache::ObjectCache;
use crate::config::AppConfig;
use crate::errors::LearnHubError;
use crate::integrations::Mailer;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    credits::{
        entities::{CreditKind, CreditTransaction},
        requests::{
            CreditChange, GrantCreditsRequest, TransactionExportParams, TransactionListParams,
            TransactionListQuery,
        },
        responses::{CreditBalanceResponse, GrantCreditsResponse},
    },
    users::entities::{User, UserRole},
};
use crate::storage::Storage;
use crate::utils::credit_ledger::{crossed_low_balance, signed_amount};
use crate::utils::csv_export::{csv_attachment, transactions_csv};

use super::{
    ServiceResult, app_data, bad_request, current_user, error_response, finish, forbidden,
    not_found, notifications, optional_app_data,
};

/// 应用一次积分变动并处理其副作用
pub(crate) async fn apply_credit_change(
    storage: &dyn Storage,
    cache: Option<&dyn ObjectCache>,
    mailer: Option<&Arc<dyn Mailer>>,
    change: CreditChange,
) -> Result<CreditTransaction, LearnHubError> {
    let transaction = storage.apply_credit_change(change).await?;

    if let Some(cache) = cache {
        RequireJWT::invalidate_user(cache, transaction.user_id).await;
    }

    let threshold = AppConfig::get().credits.low_balance_threshold;
    let before = transaction.balance_after - transaction.amount;
    if crossed_low_balance(before, transaction.balance_after, threshold) {
        match storage.get_user_by_id(transaction.user_id).await {
            Ok(Some(user)) => notifications::send(
                mailer,
                notifications::low_balance(&user, transaction.balance_after, threshold),
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                "Failed to load user {} for low balance email: {}",
                transaction.user_id,
                e
            ),
        }
    }

    tracing::info!(
        user_id = transaction.user_id,
        amount = transaction.amount,
        balance = transaction.balance_after,
        kind = %transaction.kind,
        "Credit balance changed"
    );
    Ok(transaction)
}

/// 普通用户只能查看自己的流水；管理员不指定用户时查看全部
fn scoped_user_id(user: &User, requested: Option<i64>) -> Result<Option<i64>, HttpResponse> {
    if user.role == UserRole::Admin {
        return Ok(requested);
    }
    match requested {
        Some(id) if id != user.id => Err(forbidden(
            ErrorCode::Forbidden,
            "You can only view your own transactions",
        )),
        _ => Ok(Some(user.id)),
    }
}

pub struct CreditService {
    storage: Option<Arc<dyn Storage>>,
}

impl CreditService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Result<Arc<dyn Storage>, HttpResponse> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => app_data::<dyn Storage>(request),
        }
    }

    // 当前余额与价格
    pub async fn get_balance(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        finish(self.balance(request).await)
    }

    async fn balance(&self, request: &HttpRequest) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;
        let credits = &AppConfig::get().credits;

        // 缓存中的余额可能滞后，以数据库为准
        let balance = storage
            .get_user_by_id(user.id)
            .await
            .map_err(|e| error_response(&e))?
            .map(|u| u.credits)
            .unwrap_or(user.credits);

        Ok(HttpResponse::Ok().json(ApiResponse::success(
            CreditBalanceResponse {
                balance,
                low_balance: balance < credits.low_balance_threshold,
                course_cost: credits.course_cost,
                material_cost: credits.material_cost,
            },
            "Credit balance retrieved",
        )))
    }

    // 流水分页列表
    pub async fn list_transactions(
        &self,
        request: &HttpRequest,
        params: TransactionListParams,
    ) -> ActixResult<HttpResponse> {
        finish(self.transactions(request, params).await)
    }

    async fn transactions(&self, request: &HttpRequest, params: TransactionListParams) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;
        let user_id = scoped_user_id(&user, params.user_id)?;

        let page = storage
            .list_credit_transactions_with_pagination(TransactionListQuery {
                page: Some(params.pagination.page),
                size: Some(params.pagination.size),
                user_id,
                kind: params.kind,
            })
            .await
            .map_err(|e| error_response(&e))?;

        Ok(HttpResponse::Ok().json(ApiResponse::success(page, "Transactions retrieved")))
    }

    // 导出 CSV
    pub async fn export_transactions(
        &self,
        request: &HttpRequest,
        params: TransactionExportParams,
    ) -> ActixResult<HttpResponse> {
        finish(self.export(request, params).await)
    }

    async fn export(&self, request: &HttpRequest, params: TransactionExportParams) -> ServiceResult {
        let user = current_user(request)?;
        let storage = self.get_storage(request)?;
        let user_id = scoped_user_id(&user, params.user_id)?;

        let transactions = storage
            .list_credit_transactions(user_id, params.kind)
            .await
            .map_err(|e| error_response(&e))?;
        let body = transactions_csv(&transactions).map_err(|e| error_response(&e))?;

        let filename = match user_id {
            Some(id) => format!("credit_transactions_user_{id}.csv"),
            None => "credit_transactions.csv".to_string(),
        };
        Ok(csv_attachment(&filename, body))
    }

    // 管理员发放积分
    pub async fn grant(
        &self,
        request: &HttpRequest,
        grant_request: GrantCreditsRequest,
    ) -> ActixResult<HttpResponse> {
        finish(self.grant_credits(request, grant_request).await)
    }

    async fn grant_credits(&self, request: &HttpRequest, grant: GrantCreditsRequest) -> ServiceResult {
        let admin = current_user(request)?;
        let storage = self.get_storage(request)?;

        let amount = signed_amount(CreditKind::Grant, grant.amount)
            .map_err(|e| bad_request(ErrorCode::CreditAmountInvalid, e.message()))?;

        if storage
            .get_user_by_id(grant.user_id)
            .await
            .map_err(|e| error_response(&e))?
            .is_none()
        {
            return Err(not_found(ErrorCode::UserNotFound, "User not found"));
        }

        let reason = grant
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| format!("granted by {}", admin.username));

        let cache = optional_app_data::<dyn ObjectCache>(request);
        let mailer = optional_app_data::<dyn Mailer>(request);
        let transaction = apply_credit_change(
            storage.as_ref(),
            cache.as_deref(),
            mailer.as_ref(),
            CreditChange {
                user_id: grant.user_id,
                amount,
                kind: CreditKind::Grant,
                reason,
            },
        )
        .await
        .map_err(|e| error_response(&e))?;

        Ok(HttpResponse::Ok().json(ApiResponse::success(
            GrantCreditsResponse {
                user_id: transaction.user_id,
                balance: transaction.balance_after,
            },
            "Credits granted",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserStatus;
    use actix_web::http::StatusCode;

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

    #[test]
    fn test_users_are_scoped_to_themselves() {
        let student = user(3, UserRole::User);
        assert_eq!(scoped_user_id(&student, None).unwrap(), Some(3));
        assert_eq!(scoped_user_id(&student, Some(3)).unwrap(), Some(3));
        assert_eq!(
            scoped_user_id(&student, Some(4)).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );

        // 教师同样只能看自己的
        let teacher = user(5, UserRole::Teacher);
        assert!(scoped_user_id(&teacher, Some(3)).is_err());
    }

    #[test]
    fn test_admin_may_view_anyone() {
        let admin = user(1, UserRole::Admin);
        assert_eq!(scoped_user_id(&admin, None).unwrap(), None);
        assert_eq!(scoped_user_id(&admin, Some(9)).unwrap(), Some(9));
    }
}
