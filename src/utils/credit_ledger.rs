//! 积分记账
//!
//! 纯计算部分：余额变动校验、流水金额符号。实际的读写在存储层事务内完成。

use crate::errors::LearnHubError;
use crate::models::credits::entities::CreditKind;

/// 一次余额变动的计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub amount: i64,
    pub balance_after: i64,
}

/// 在当前余额上应用带符号的变动，余额不得为负
pub fn apply_change(balance: i64, amount: i64) -> Result<LedgerEntry, LearnHubError> {
    let balance_after = balance
        .checked_add(amount)
        .ok_or_else(|| LearnHubError::validation("credit balance overflow"))?;

    if balance_after < 0 {
        return Err(LearnHubError::insufficient_credits(format!(
            "balance {balance} cannot cover {}",
            -amount
        )));
    }

    Ok(LedgerEntry {
        amount,
        balance_after,
    })
}

/// 按流水类型得到带符号金额；`amount` 为正数
pub fn signed_amount(kind: CreditKind, amount: i64) -> Result<i64, LearnHubError> {
    if amount <= 0 {
        return Err(LearnHubError::validation("credit amount must be positive"));
    }
    Ok(if kind.is_debit() { -amount } else { amount })
}

/// 是否跨过低余额阈值（变动前高于等于阈值，变动后低于阈值）
pub fn crossed_low_balance(before: i64, after: i64, threshold: i64) -> bool {
    before >= threshold && after < threshold
}

/// 扣费类流水的总额（正数）
pub fn total_spent(amounts: &[i64]) -> i64 {
    amounts.iter().filter(|a| **a < 0).map(|a| a.saturating_neg()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_within_balance() {
        let entry = apply_change(50, -20).unwrap();
        assert_eq!(entry.balance_after, 30);
        assert_eq!(entry.amount, -20);
    }

    #[test]
    fn test_deduction_to_exactly_zero() {
        assert_eq!(apply_change(20, -20).unwrap().balance_after, 0);
    }

    #[test]
    fn test_balance_never_negative() {
        let err = apply_change(10, -11).unwrap_err();
        assert_eq!(err.code(), "E013");
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(apply_change(i64::MAX, 1).is_err());
    }

    #[test]
    fn test_signed_amount_by_kind() {
        assert_eq!(signed_amount(CreditKind::Deduction, 5).unwrap(), -5);
        assert_eq!(signed_amount(CreditKind::Refund, 5).unwrap(), 5);
        assert_eq!(signed_amount(CreditKind::Grant, 5).unwrap(), 5);
        assert!(signed_amount(CreditKind::Grant, 0).is_err());
        assert!(signed_amount(CreditKind::Purchase, -3).is_err());
    }

    #[test]
    fn test_low_balance_crossing() {
        assert!(crossed_low_balance(25, 15, 20));
        assert!(!crossed_low_balance(15, 10, 20));
        assert!(!crossed_low_balance(40, 30, 20));
    }

    #[test]
    fn test_total_spent_counts_only_debits() {
        assert_eq!(total_spent(&[100, -20, -5, 20]), 25);
        assert_eq!(total_spent(&[]), 0);
    }
}
