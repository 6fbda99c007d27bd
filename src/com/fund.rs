// COM 基金账本 / COM fund ledger

use crate::com::{
    errors::{ensure, ComError, Result},
    types::ComFund,
};
use crate::db::LedgerTx;

/// 账户基金表, 与账户主余额相互独立
/// Account fund table, independent of the account's spendable balance
pub struct FundTable;

impl FundTable {
    fn key(owner: &str) -> String {
        format!("com_fund:{}", owner)
    }

    pub fn get(tx: &LedgerTx, owner: &str) -> Result<Option<ComFund>> {
        Ok(tx.get(&Self::key(owner))?)
    }

    /// 转入基金, 首次转入时创建记录
    /// Credit the fund, creating the record on first credit
    pub fn credit(tx: &mut LedgerTx, owner: &str, amount: i64) -> Result<()> {
        ensure(amount > 0, || {
            ComError::NonPositiveAmount("must transfer positive amount to COM fund".to_string())
        })?;
        let mut fund = Self::get(tx, owner)?.unwrap_or_else(|| ComFund {
            owner: owner.to_string(),
            balance: 0,
        });
        fund.balance = fund
            .balance
            .checked_add(amount)
            .ok_or_else(|| ComError::InvariantViolation("fund balance overflow".to_string()))?;
        tx.put(&Self::key(owner), &fund)?;
        Ok(())
    }

    /// 从基金转出 / Debit the fund
    pub fn debit(tx: &mut LedgerTx, owner: &str, amount: i64) -> Result<()> {
        ensure(amount > 0, || {
            ComError::NonPositiveAmount("must transfer positive amount from COM fund".to_string())
        })?;
        let mut fund = Self::get(tx, owner)?
            .ok_or_else(|| ComError::NotFound("must deposit to COM fund first".to_string()))?;
        ensure(amount <= fund.balance, || {
            ComError::InsufficientFunds("insufficient funds".to_string())
        })?;
        fund.balance -= amount;
        tx.put(&Self::key(owner), &fund)?;
        Ok(())
    }

    pub fn remove(tx: &mut LedgerTx, owner: &str) {
        tx.delete(&Self::key(owner));
    }
}
