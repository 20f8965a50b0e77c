use super::{SeaOrmStorage, page_params};
use crate::entity::credit_transactions::{ActiveModel, Column, Entity as CreditTransactions};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{LearnHubError, Result};
use crate::models::{
    PaginatedResponse, PaginationInfo,
    credits::{
        entities::{CreditKind, CreditTransaction},
        requests::{CreditChange, TransactionListQuery},
    },
};
use crate::utils::credit_ledger::apply_change;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait, sea_query::Expr,
};

impl SeaOrmStorage {
    /// 更新余额并写入流水
    ///
    /// 余额更新以读到的旧余额为条件，并发修改时返回错误而不是覆盖。
    pub async fn apply_credit_change_impl(&self, change: CreditChange) -> Result<CreditTransaction> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("开启事务失败: {e}")))?;

        let user = Users::find_by_id(change.user_id)
            .one(&txn)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询用户失败: {e}")))?
            .ok_or_else(|| LearnHubError::not_found(format!("用户 {} 不存在", change.user_id)))?;

        let entry = apply_change(user.credits, change.amount)?;
        let now = chrono::Utc::now().timestamp();

        let updated = Users::update_many()
            .col_expr(UserColumn::Credits, Expr::value(entry.balance_after))
            .col_expr(UserColumn::UpdatedAt, Expr::value(now))
            .filter(UserColumn::Id.eq(user.id))
            .filter(UserColumn::Credits.eq(user.credits))
            .exec(&txn)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新积分余额失败: {e}")))?;

        if updated.rows_affected == 0 {
            return Err(LearnHubError::database_operation(
                "积分余额已被并发修改，请重试",
            ));
        }

        let record = ActiveModel {
            user_id: Set(user.id),
            amount: Set(entry.amount),
            balance_after: Set(entry.balance_after),
            kind: Set(change.kind.to_string()),
            reason: Set(change.reason),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| LearnHubError::database_operation(format!("写入积分流水失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(record.into_transaction())
    }

    fn filtered_transactions(
        user_id: Option<i64>,
        kind: Option<CreditKind>,
    ) -> Select<CreditTransactions> {
        let mut select = CreditTransactions::find();

        if let Some(user_id) = user_id {
            select = select.filter(Column::UserId.eq(user_id));
        }

        if let Some(kind) = kind {
            select = select.filter(Column::Kind.eq(kind.to_string()));
        }

        select
    }

    /// 分页列出流水，最新的在前
    pub async fn list_credit_transactions_with_pagination_impl(
        &self,
        query: TransactionListQuery,
    ) -> Result<PaginatedResponse<CreditTransaction>> {
        let (page, size) = page_params(query.page, query.size);

        let select = Self::filtered_transactions(query.user_id, query.kind)
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询流水总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询流水页数失败: {e}")))?;

        let records = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询流水列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: records.into_iter().map(|m| m.into_transaction()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 列出全部流水（导出用），按时间升序
    pub async fn list_credit_transactions_impl(
        &self,
        user_id: Option<i64>,
        kind: Option<CreditKind>,
    ) -> Result<Vec<CreditTransaction>> {
        let records = Self::filtered_transactions(user_id, kind)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询流水列表失败: {e}")))?;

        Ok(records.into_iter().map(|m| m.into_transaction()).collect())
    }

    pub async fn list_credit_amounts_impl(&self, kind: CreditKind) -> Result<Vec<i64>> {
        CreditTransactions::find()
            .filter(Column::Kind.eq(kind.to_string()))
            .select_only()
            .column(Column::Amount)
            .into_tuple::<i64>()
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询流水金额失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::storage_with_user;
    use super::*;

    #[tokio::test]
    async fn test_overdraft_leaves_balance_and_ledger_untouched() {
        let (storage, user) = storage_with_user(10).await;

        let err = storage
            .apply_credit_change_impl(CreditChange {
                user_id: user.id,
                amount: -50,
                kind: CreditKind::Deduction,
                reason: "course creation".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E013");

        let reloaded = storage.get_user_by_id_impl(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.credits, 10);

        let ledger = storage
            .list_credit_transactions_impl(Some(user.id), None)
            .await
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, CreditKind::Grant);
    }

    #[tokio::test]
    async fn test_deduction_then_refund_restores_balance() {
        let (storage, user) = storage_with_user(30).await;

        let charged = storage
            .apply_credit_change_impl(CreditChange {
                user_id: user.id,
                amount: -20,
                kind: CreditKind::Deduction,
                reason: "course creation".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(charged.balance_after, 10);

        let refunded = storage
            .apply_credit_change_impl(CreditChange {
                user_id: user.id,
                amount: 20,
                kind: CreditKind::Refund,
                reason: "refund".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(refunded.balance_after, 30);

        let refunds = storage
            .list_credit_transactions_impl(Some(user.id), Some(CreditKind::Refund))
            .await
            .unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, 20);
    }

    #[tokio::test]
    async fn test_change_for_missing_user() {
        let (storage, _) = storage_with_user(0).await;
        let err = storage
            .apply_credit_change_impl(CreditChange {
                user_id: 999,
                amount: 5,
                kind: CreditKind::Grant,
                reason: "grant".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");
    }
}
