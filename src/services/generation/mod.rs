//! 后台生成任务
//!
//! 请求处理只负责扣费、写入 `generating` 状态并返回 202，实际的大模型调用通过
//! `tokio::spawn` 在这里完成。任务失败时记录 `failed` 状态并退还本次扣费。

pub mod course;
pub mod material;

pub use course::{generate_layout, spawn_course_generation};
pub use material::{generate_material_content, spawn_material_generation};

use actix_web::{HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::cache::ObjectCache;
use crate::errors::LearnHubError;
use crate::integrations::{EmailMessage, LlmClient, Mailer};
use crate::models::credits::{
    entities::{CreditKind, CreditTransaction},
    requests::CreditChange,
};
use crate::storage::Storage;

use super::{app_data, credits::apply_credit_change, notifications, optional_app_data};

/// 后台任务需要的共享依赖，可以脱离请求独立存活
#[derive(Clone)]
pub struct GenerationContext {
    pub storage: Arc<dyn Storage>,
    pub llm: Arc<dyn LlmClient>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub cache: Option<Arc<dyn ObjectCache>>,
    /// 课程大纲生成后是否逐章生成笔记
    pub notes_on_create: bool,
}

impl GenerationContext {
    pub fn from_request(request: &HttpRequest) -> Result<Self, HttpResponse> {
        Ok(Self {
            storage: app_data::<dyn Storage>(request)?,
            llm: app_data::<dyn LlmClient>(request)?,
            mailer: optional_app_data::<dyn Mailer>(request),
            cache: optional_app_data::<dyn ObjectCache>(request),
            notes_on_create: crate::config::AppConfig::get().generation.notes_on_create,
        })
    }

    pub fn notify(&self, message: EmailMessage) {
        notifications::send(self.mailer.as_ref(), message);
    }

    /// 扣除 `cost` 积分，余额不足时返回 `InsufficientCredits`
    pub async fn charge(
        &self,
        user_id: i64,
        cost: i64,
        reason: String,
    ) -> Result<Option<CreditTransaction>, LearnHubError> {
        if cost <= 0 {
            return Ok(None);
        }
        self.change(CreditChange {
            user_id,
            amount: -cost,
            kind: CreditKind::Deduction,
            reason,
        })
        .await
        .map(Some)
    }

    /// 退还积分；失败只记录日志，不影响任务状态
    pub async fn refund(&self, user_id: i64, amount: i64, reason: String) -> Option<CreditTransaction> {
        if amount <= 0 {
            return None;
        }
        let result = self
            .change(CreditChange {
                user_id,
                amount,
                kind: CreditKind::Refund,
                reason,
            })
            .await;

        match result {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                tracing::error!("Failed to refund {} credits to user {}: {}", amount, user_id, e);
                None
            }
        }
    }

    async fn change(&self, change: CreditChange) -> Result<CreditTransaction, LearnHubError> {
        apply_credit_change(
            self.storage.as_ref(),
            self.cache.as_deref(),
            self.mailer.as_ref(),
            change,
        )
        .await
    }
}
